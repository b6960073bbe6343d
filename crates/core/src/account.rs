use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountCode(pub String);

impl AccountCode {
    pub fn new(code: impl Into<String>) -> Self {
        AccountCode(code.into())
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chart-of-accounts entry offered as a categorization target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCandidate {
    pub code: AccountCode,
    pub name: String,
}

impl CategoryCandidate {
    pub fn new(code: &str, name: &str) -> Self {
        CategoryCandidate {
            code: AccountCode::new(code),
            name: name.to_string(),
        }
    }
}

/// Default categorization targets when nothing matched, by polarity.
pub const FALLBACK_INCOME: (&str, &str) = ("260", "Other Revenue");
pub const FALLBACK_EXPENSE: (&str, &str) = ("429", "General Expenses");
