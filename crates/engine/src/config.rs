use arbiter_core::{CategoryCandidate, FALLBACK_EXPENSE, FALLBACK_INCOME};

/// Thresholds for payment matching, passed in explicitly so threshold
/// provenance is traceable per call site.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Confidence at which a single unambiguous candidate is applied
    /// without human review.
    pub auto_apply_threshold: u8,
    /// Minimum score for a candidate to be considered at all.
    pub candidate_threshold: u8,
    /// How many runner-up candidates a decision carries.
    pub max_alternatives: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            auto_apply_threshold: 80,
            candidate_threshold: 20,
            max_alternatives: 4,
        }
    }
}

/// Thresholds and fallback targets for categorization.
#[derive(Debug, Clone)]
pub struct CategorizerConfig {
    pub auto_apply_threshold: u8,
    /// Transactions above this amount never auto-apply, whatever their
    /// confidence. `None` disables the ceiling.
    pub max_auto_apply_cents: Option<i64>,
    /// Suggested when nothing matches a credit.
    pub fallback_income: CategoryCandidate,
    /// Suggested when nothing matches a debit.
    pub fallback_expense: CategoryCandidate,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            auto_apply_threshold: 80,
            max_auto_apply_cents: Some(1_000_000),
            fallback_income: CategoryCandidate::new(FALLBACK_INCOME.0, FALLBACK_INCOME.1),
            fallback_expense: CategoryCandidate::new(FALLBACK_EXPENSE.0, FALLBACK_EXPENSE.1),
        }
    }
}
