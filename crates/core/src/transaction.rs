use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether the money moved into (credit) or out of (debit) the bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Credit,
    Debit,
}

/// A bank-feed transaction as handed to the engine. `amount_cents` is a
/// non-negative magnitude; `direction` carries the sign. The engine only
/// reads it; ownership stays with the calling workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub direction: Direction,
    pub reference: Option<String>,
    pub payee: Option<String>,
    pub description: String,
}
