use thiserror::Error;

use arbiter_audit::AuditLog;
use arbiter_core::{
    BankTransaction, Decision, DecisionAction, DecisionRecord, EscalationKind, EscalationRecord,
    InvoiceCandidate, RankedAlternative, TenantId,
};

use crate::config::MatcherConfig;
use crate::signals::{amount_score, name_score, reference_score, SignalScore};
use crate::source::{CandidateSource, SourceError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The candidate read failed. Deliberately not folded into NoMatch:
    /// "could not determine candidates" and "no eligible candidates" are
    /// different answers.
    #[error("candidate lookup failed: {0}")]
    Source(#[from] SourceError),
}

/// An invoice that survived scoring, with its aggregated confidence.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub invoice: InvoiceCandidate,
    pub confidence: u8,
    pub signals: Vec<SignalScore>,
}

/// Score every lifecycle-eligible invoice against the transaction and drop
/// those below the candidate threshold. The result is sorted by confidence
/// descending; equal scores keep their source order, so "first seen wins"
/// and the storage layer's ordering is the secondary key.
pub fn score_candidates(
    transaction: &BankTransaction,
    invoices: &[InvoiceCandidate],
    config: &MatcherConfig,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = invoices
        .iter()
        .filter(|invoice| eligible(invoice))
        .map(|invoice| score_one(transaction, invoice))
        .filter(|candidate| candidate.confidence >= config.candidate_threshold)
        .collect();
    scored.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    scored
}

fn eligible(invoice: &InvoiceCandidate) -> bool {
    if !invoice.status.is_open() {
        tracing::debug!(invoice = %invoice.id, status = %invoice.status, "skipping non-open invoice");
        return false;
    }
    let outstanding = invoice.outstanding_cents();
    if outstanding <= 0 {
        // Covers both fully-allocated invoices and malformed snapshots with
        // negative outstanding; neither can absorb a payment.
        tracing::debug!(invoice = %invoice.id, outstanding, "skipping invoice with no outstanding balance");
        return false;
    }
    true
}

fn score_one(transaction: &BankTransaction, invoice: &InvoiceCandidate) -> ScoredCandidate {
    let signals = vec![
        reference_score(transaction.reference.as_deref(), &invoice.number),
        amount_score(transaction.amount_cents, invoice.outstanding_cents()),
        name_score(transaction.payee.as_deref(), &invoice.counterparty),
    ];
    let total: u32 = signals.iter().map(|s| u32::from(s.points)).sum();
    ScoredCandidate {
        invoice: invoice.clone(),
        confidence: total.min(100) as u8,
        signals,
    }
}

/// Convert scored candidates into a decision plus, for anything short of a
/// clean auto-apply or no-match, the escalation that queues it for review.
pub fn classify(
    tenant: &TenantId,
    transaction: &BankTransaction,
    scored: &[ScoredCandidate],
    config: &MatcherConfig,
) -> (Decision, Option<EscalationRecord>) {
    let Some(best) = scored.first() else {
        let decision = Decision {
            tenant: tenant.clone(),
            subject_id: transaction.id.clone(),
            chosen_candidate: None,
            confidence: 0,
            action: DecisionAction::NoMatch,
            reasoning: "no matching candidates found".to_string(),
            alternatives: Vec::new(),
        };
        return (decision, None);
    };

    let at_threshold: Vec<&ScoredCandidate> = scored
        .iter()
        .filter(|c| c.confidence >= config.auto_apply_threshold)
        .collect();
    let alternatives: Vec<RankedAlternative> = scored[1..]
        .iter()
        .take(config.max_alternatives)
        .map(|c| RankedAlternative {
            candidate_id: c.invoice.id.clone(),
            confidence: c.confidence,
        })
        .collect();
    let signal_summary = best
        .signals
        .iter()
        .filter(|s| s.points > 0)
        .map(|s| s.reason.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let (action, reasoning, escalation) = match at_threshold.len() {
        1 => (DecisionAction::AutoApply, signal_summary, None),
        0 => {
            let reason = format!(
                "best candidate {} scored {}, below auto-apply threshold {}",
                best.invoice.number, best.confidence, config.auto_apply_threshold
            );
            let escalation = EscalationRecord::pending(
                tenant.clone(),
                &transaction.id,
                EscalationKind::LowConfidence,
                reason,
                vec![best.invoice.id.clone()],
            );
            (
                DecisionAction::ReviewRequired,
                format!(
                    "{signal_summary} (confidence {} below threshold {})",
                    best.confidence, config.auto_apply_threshold
                ),
                Some(escalation),
            )
        }
        n => {
            let reason = format!(
                "{n} candidates scored at or above {}; confidence alone cannot disambiguate",
                config.auto_apply_threshold
            );
            let escalation = EscalationRecord::pending(
                tenant.clone(),
                &transaction.id,
                EscalationKind::AmbiguousMatch,
                reason.clone(),
                at_threshold.iter().map(|c| c.invoice.id.clone()).collect(),
            );
            (
                DecisionAction::ReviewRequired,
                format!("ambiguous match: {reason}"),
                Some(escalation),
            )
        }
    };

    let decision = Decision {
        tenant: tenant.clone(),
        subject_id: transaction.id.clone(),
        chosen_candidate: Some(best.invoice.id.clone()),
        confidence: best.confidence,
        action,
        reasoning,
        alternatives,
    };
    (decision, escalation)
}

/// Matches incoming bank credits to outstanding invoices.
pub struct PaymentMatcher<S> {
    config: MatcherConfig,
    source: S,
    audit: AuditLog,
}

impl<S: CandidateSource> PaymentMatcher<S> {
    pub fn new(config: MatcherConfig, source: S, audit: AuditLog) -> Self {
        PaymentMatcher {
            config,
            source,
            audit,
        }
    }

    /// Fetch candidates, score, classify, log. The candidate read is the
    /// only failure surfaced to the caller; audit writes fail open.
    pub async fn match_transaction(
        &self,
        tenant: &TenantId,
        transaction: &BankTransaction,
    ) -> Result<Decision, EngineError> {
        let invoices = self.source.invoice_candidates(tenant, transaction).await?;
        let scored = score_candidates(transaction, &invoices, &self.config);
        let (decision, escalation) = classify(tenant, transaction, &scored, &self.config);

        self.audit.record_decision(DecisionRecord::from_decision(&decision));
        if let Some(escalation) = escalation {
            self.audit.record_escalation(escalation);
        }
        Ok(decision)
    }
}
