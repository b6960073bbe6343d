use async_trait::async_trait;
use thiserror::Error;

use arbiter_core::{AccountCode, BankTransaction, InvoiceCandidate, TenantId};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Most frequent prior categorization found for a payee.
#[derive(Debug, Clone)]
pub struct HistoricalMatch {
    pub code: AccountCode,
    pub name: String,
    pub occurrences: u32,
}

/// Observed amount distribution for one account.
#[derive(Debug, Clone, Copy)]
pub struct AmountProfile {
    pub sample_count: u32,
    pub mean_cents: i64,
}

/// The storage collaborator the engine reads candidates through. Queries
/// must be tenant-scoped and exclude soft-deleted records. Cancellation and
/// timeouts surface as `SourceError`; the engine propagates them unchanged
/// rather than masking them as decisions.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn invoice_candidates(
        &self,
        tenant: &TenantId,
        transaction: &BankTransaction,
    ) -> Result<Vec<InvoiceCandidate>, SourceError>;

    /// Most frequent account among the tenant's prior categorized
    /// transactions whose payee contains `payee` case-insensitively.
    async fn historical_account(
        &self,
        tenant: &TenantId,
        payee: &str,
    ) -> Result<Option<HistoricalMatch>, SourceError>;

    async fn amount_profile(
        &self,
        tenant: &TenantId,
        code: &AccountCode,
    ) -> Result<Option<AmountProfile>, SourceError>;
}

// ── In-memory source ──────────────────────────────────────────────────────────

struct HistoryRow {
    tenant: TenantId,
    payee: String,
    code: AccountCode,
    name: String,
    amount_cents: i64,
}

/// In-memory implementation of the same contract the SQLite source serves.
/// Used by tests and by callers that assemble candidate pools themselves.
#[derive(Default)]
pub struct MemorySource {
    invoices: Vec<(TenantId, InvoiceCandidate)>,
    history: Vec<HistoryRow>,
    fail_invoice_reads: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose invoice reads always fail, for exercising the
    /// fail-fast path.
    pub fn failing() -> Self {
        MemorySource {
            fail_invoice_reads: true,
            ..Self::default()
        }
    }

    pub fn add_invoice(&mut self, tenant: &TenantId, invoice: InvoiceCandidate) {
        self.invoices.push((tenant.clone(), invoice));
    }

    pub fn add_history(
        &mut self,
        tenant: &TenantId,
        payee: &str,
        code: &str,
        name: &str,
        amount_cents: i64,
    ) {
        self.history.push(HistoryRow {
            tenant: tenant.clone(),
            payee: payee.to_string(),
            code: AccountCode::new(code),
            name: name.to_string(),
            amount_cents,
        });
    }
}

#[async_trait]
impl CandidateSource for MemorySource {
    async fn invoice_candidates(
        &self,
        tenant: &TenantId,
        _transaction: &BankTransaction,
    ) -> Result<Vec<InvoiceCandidate>, SourceError> {
        if self.fail_invoice_reads {
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        Ok(self
            .invoices
            .iter()
            .filter(|(t, _)| t == tenant)
            .map(|(_, invoice)| invoice.clone())
            .collect())
    }

    async fn historical_account(
        &self,
        tenant: &TenantId,
        payee: &str,
    ) -> Result<Option<HistoricalMatch>, SourceError> {
        let probe = payee.to_lowercase();
        let mut counts: Vec<(AccountCode, String, u32)> = Vec::new();
        for row in self.history.iter().filter(|r| &r.tenant == tenant) {
            if !row.payee.to_lowercase().contains(&probe) {
                continue;
            }
            match counts.iter_mut().find(|(code, _, _)| *code == row.code) {
                Some((_, _, n)) => *n += 1,
                None => counts.push((row.code.clone(), row.name.clone(), 1)),
            }
        }
        Ok(counts
            .into_iter()
            .max_by_key(|(_, _, n)| *n)
            .map(|(code, name, occurrences)| HistoricalMatch {
                code,
                name,
                occurrences,
            }))
    }

    async fn amount_profile(
        &self,
        tenant: &TenantId,
        code: &AccountCode,
    ) -> Result<Option<AmountProfile>, SourceError> {
        let amounts: Vec<i64> = self
            .history
            .iter()
            .filter(|r| &r.tenant == tenant && &r.code == code)
            .map(|r| r.amount_cents)
            .collect();
        if amounts.is_empty() {
            return Ok(None);
        }
        let mean = amounts.iter().sum::<i64>() / amounts.len() as i64;
        Ok(Some(AmountProfile {
            sample_count: amounts.len() as u32,
            mean_cents: mean,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::InvoiceStatus;
    use chrono::NaiveDate;

    fn tx(tenant_payee: &str) -> BankTransaction {
        BankTransaction {
            id: "tx-1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            amount_cents: 1_000,
            direction: arbiter_core::Direction::Debit,
            reference: None,
            payee: Some(tenant_payee.to_string()),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn invoice_reads_are_tenant_scoped() {
        let tenant_a = TenantId::new("a");
        let tenant_b = TenantId::new("b");
        let mut source = MemorySource::new();
        source.add_invoice(
            &tenant_a,
            InvoiceCandidate {
                id: "inv-a".to_string(),
                number: "INV-1".to_string(),
                counterparty: "Acme".to_string(),
                total_cents: 100,
                allocated_cents: 0,
                status: InvoiceStatus::Sent,
            },
        );

        let for_a = source.invoice_candidates(&tenant_a, &tx("Acme")).await.unwrap();
        let for_b = source.invoice_candidates(&tenant_b, &tx("Acme")).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert!(for_b.is_empty());
    }

    #[tokio::test]
    async fn historical_account_picks_most_frequent_substring_match() {
        let tenant = TenantId::new("a");
        let mut source = MemorySource::new();
        source.add_history(&tenant, "GitHub Inc", "485", "Subscriptions", 1_900);
        source.add_history(&tenant, "GITHUB PAYMENT", "485", "Subscriptions", 1_900);
        source.add_history(&tenant, "GitHub Sponsors", "429", "General Expenses", 500);

        let found = source
            .historical_account(&tenant, "github")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code, AccountCode::new("485"));
        assert_eq!(found.occurrences, 2);
    }

    #[tokio::test]
    async fn amount_profile_reports_count_and_mean() {
        let tenant = TenantId::new("a");
        let mut source = MemorySource::new();
        for cents in [900, 1_000, 1_100] {
            source.add_history(&tenant, "Coffee Co", "420", "Meals", cents);
        }

        let profile = source
            .amount_profile(&tenant, &AccountCode::new("420"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.sample_count, 3);
        assert_eq!(profile.mean_cents, 1_000);

        let none = source
            .amount_profile(&tenant, &AccountCode::new("999"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn failing_source_errors_on_invoice_reads() {
        let source = MemorySource::failing();
        let result = source
            .invoice_candidates(&TenantId::new("a"), &tx("Acme"))
            .await;
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
    }
}
