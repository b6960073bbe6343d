use arbiter_audit::AuditLog;
use arbiter_core::{
    AccountCode, BankTransaction, CategoryCandidate, Decision, DecisionAction, DecisionRecord,
    Direction, EscalationKind, EscalationRecord, Money, TenantId,
};

use crate::config::CategorizerConfig;
use crate::patterns::PatternService;
use crate::source::{AmountProfile, CandidateSource};

/// Base confidence for a history-only categorization. Deliberately below
/// what the aggregate needs to clear the auto-apply threshold: history can
/// suggest an account but never act unsupervised.
const HISTORICAL_CONFIDENCE: u8 = 60;

/// Fewest prior samples before the amount band means anything.
const MIN_BAND_SAMPLES: u32 = 3;

const WEIGHT_BASE: f64 = 0.70;
const WEIGHT_QUALITY: f64 = 0.15;
const WEIGHT_BAND: f64 = 0.15;

/// 10 points per word longer than two characters, capped at 100. A richer
/// bank description earns more trust toward auto-apply.
pub fn description_quality(description: &str) -> u8 {
    let words = description
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .count() as u32;
    (words * 10).min(100) as u8
}

fn aggregate(base: u8, quality: u8, band: u8) -> u8 {
    let weighted = WEIGHT_BASE * f64::from(base)
        + WEIGHT_QUALITY * f64::from(quality)
        + WEIGHT_BAND * f64::from(band);
    weighted.round().min(100.0) as u8
}

/// Categorizes bank transactions against the chart of accounts.
pub struct Categorizer<S> {
    config: CategorizerConfig,
    patterns: PatternService,
    source: S,
    audit: AuditLog,
}

impl<S: CandidateSource> Categorizer<S> {
    pub fn new(config: CategorizerConfig, patterns: PatternService, source: S, audit: AuditLog) -> Self {
        Categorizer {
            config,
            patterns,
            source,
            audit,
        }
    }

    /// Pick an account for the transaction and decide whether to apply it
    /// unsupervised. Never fails: lookup errors degrade to the fallback
    /// path and the decision is still produced and logged.
    pub async fn categorize(&self, tenant: &TenantId, transaction: &BankTransaction) -> Decision {
        let set = self.patterns.current();

        let (candidate, base, is_fallback, flagged, match_reason) = match set.best_match(transaction)
        {
            Some(p) => (
                CategoryCandidate::new(&p.account_code, &p.account_name),
                p.confidence,
                false,
                p.requires_review.then(|| {
                    p.review_reason
                        .clone()
                        .unwrap_or_else(|| format!("pattern {} is flagged for review", p.id))
                }),
                format!("pattern {} matched", p.id),
            ),
            None => match self.lookup_history(tenant, transaction).await {
                Some((candidate, occurrences)) => {
                    let reason = format!(
                        "payee previously categorized to {} ({occurrences} time(s))",
                        candidate.code
                    );
                    (candidate, HISTORICAL_CONFIDENCE, false, None, reason)
                }
                None => {
                    let candidate = self.fallback_for(transaction.direction);
                    let reason = format!(
                        "no pattern or history matched; defaulting to {} by polarity",
                        candidate.code
                    );
                    (candidate, 0, true, None, reason)
                }
            },
        };

        let quality = description_quality(&transaction.description);
        let (band, band_reason) = if is_fallback {
            (50, "no amount history for account")
        } else {
            self.band_score(tenant, &candidate.code, transaction.amount_cents)
                .await
        };
        let confidence = aggregate(base, quality, band);

        // Veto ladder: each can hold auto-apply back even when the numeric
        // threshold clears.
        let veto = if let Some(reason) = flagged {
            Some((EscalationKind::PatternFlagged, reason))
        } else if let Some(max) = self
            .config
            .max_auto_apply_cents
            .filter(|max| transaction.amount_cents > *max)
        {
            Some((
                EscalationKind::AmountExceedsMaximum,
                format!(
                    "amount {} exceeds auto-apply maximum {}",
                    Money::from_cents(transaction.amount_cents),
                    Money::from_cents(max)
                ),
            ))
        } else if is_fallback || confidence < self.config.auto_apply_threshold {
            Some((
                EscalationKind::LowConfidence,
                format!(
                    "confidence {confidence} below auto-apply threshold {}",
                    self.config.auto_apply_threshold
                ),
            ))
        } else {
            None
        };

        let reasoning = format!("{match_reason}; description quality {quality}; {band_reason}");
        let (action, escalation) = match veto {
            None => (DecisionAction::AutoApply, None),
            Some((kind, reason)) => (
                DecisionAction::ReviewRequired,
                Some(EscalationRecord::pending(
                    tenant.clone(),
                    &transaction.id,
                    kind,
                    reason,
                    vec![candidate.code.to_string()],
                )),
            ),
        };

        let decision = Decision {
            tenant: tenant.clone(),
            subject_id: transaction.id.clone(),
            chosen_candidate: Some(candidate.code.to_string()),
            confidence,
            action,
            reasoning,
            alternatives: Vec::new(),
        };

        self.audit.record_decision(DecisionRecord::from_decision(&decision));
        if let Some(escalation) = escalation {
            self.audit.record_escalation(escalation);
        }
        decision
    }

    async fn lookup_history(
        &self,
        tenant: &TenantId,
        transaction: &BankTransaction,
    ) -> Option<(CategoryCandidate, u32)> {
        let payee = transaction.payee.as_deref()?;
        match self.source.historical_account(tenant, payee).await {
            Ok(found) => found.map(|h| {
                (
                    CategoryCandidate {
                        code: h.code,
                        name: h.name,
                    },
                    h.occurrences,
                )
            }),
            Err(e) => {
                tracing::warn!("historical lookup failed, continuing without: {e}");
                None
            }
        }
    }

    async fn band_score(
        &self,
        tenant: &TenantId,
        code: &AccountCode,
        amount_cents: i64,
    ) -> (u8, &'static str) {
        let profile = match self.source.amount_profile(tenant, code).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("amount profile lookup failed, continuing without: {e}");
                None
            }
        };
        match profile {
            Some(AmountProfile {
                sample_count,
                mean_cents,
            }) if sample_count >= MIN_BAND_SAMPLES => {
                // In-band means 0.5x to 2x the account's observed mean.
                if 2 * amount_cents >= mean_cents && amount_cents <= 2 * mean_cents {
                    (100, "amount within the account's usual band")
                } else {
                    (0, "amount outside the account's usual band")
                }
            }
            _ => (50, "no amount history for account"),
        }
    }

    fn fallback_for(&self, direction: Direction) -> CategoryCandidate {
        match direction {
            Direction::Credit => self.config.fallback_income.clone(),
            Direction::Debit => self.config.fallback_expense.clone(),
        }
    }
}
