use std::sync::{Arc, PoisonError, RwLock};

use regex::RegexBuilder;
use serde::Deserialize;
use thiserror::Error;

use arbiter_core::{BankTransaction, Direction};

/// One row of the versioned categorization pattern source.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryPattern {
    pub id: String,
    /// Regex source, matched case-insensitively against payee + description.
    pub pattern: String,
    pub account_code: String,
    pub account_name: String,
    #[serde(default)]
    pub vat_code: Option<String>,
    /// Author-assigned 0–100; yielded as-is on match, never recomputed.
    pub confidence: u8,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub max_amount_cents: Option<i64>,
    #[serde(default)]
    pub requires_review: bool,
    #[serde(default)]
    pub review_reason: Option<String>,
}

/// The pattern source document, loaded once at process start.
#[derive(Debug, Deserialize)]
pub struct PatternFile {
    pub version: u32,
    pub patterns: Vec<CategoryPattern>,
}

#[derive(Debug, Error)]
pub enum PatternFileError {
    #[error("failed to parse pattern file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl PatternFile {
    pub fn from_toml(content: &str) -> Result<Self, PatternFileError> {
        Ok(toml::from_str(content)?)
    }
}

/// A pattern whose regex failed to compile. Recorded once at build time and
/// skipped for the rest of the process lifetime, never retried.
#[derive(Debug, Clone)]
pub struct InvalidPattern {
    pub id: String,
    pub error: String,
}

struct CompiledPattern {
    pattern: CategoryPattern,
    regex: regex::Regex,
}

/// Immutable set of compiled patterns. Built once from the versioned
/// source; a reload replaces the whole set.
pub struct PatternSet {
    version: u32,
    compiled: Vec<CompiledPattern>,
    invalid: Vec<InvalidPattern>,
}

impl PatternSet {
    pub fn compile(version: u32, patterns: Vec<CategoryPattern>) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        let mut invalid = Vec::new();
        for pattern in patterns {
            match RegexBuilder::new(&pattern.pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => compiled.push(CompiledPattern { pattern, regex }),
                Err(e) => {
                    tracing::warn!(pattern = %pattern.id, "invalid categorization pattern: {e}");
                    invalid.push(InvalidPattern {
                        id: pattern.id,
                        error: e.to_string(),
                    });
                }
            }
        }
        PatternSet {
            version,
            compiled,
            invalid,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn invalid(&self) -> &[InvalidPattern] {
        &self.invalid
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// First pattern, in source order, that passes the polarity and amount
    /// filters and whose regex matches the transaction's payee plus
    /// description.
    pub fn best_match(&self, transaction: &BankTransaction) -> Option<&CategoryPattern> {
        let text = match &transaction.payee {
            Some(payee) => format!("{payee} {}", transaction.description),
            None => transaction.description.clone(),
        };
        self.compiled
            .iter()
            .filter(|c| applicable(&c.pattern, transaction))
            .find(|c| c.regex.is_match(&text))
            .map(|c| &c.pattern)
    }
}

fn applicable(pattern: &CategoryPattern, transaction: &BankTransaction) -> bool {
    if let Some(direction) = pattern.direction {
        if direction != transaction.direction {
            return false;
        }
    }
    if let Some(ceiling) = pattern.max_amount_cents {
        if transaction.amount_cents > ceiling {
            return false;
        }
    }
    true
}

/// Shared handle to the current pattern set. Reads take an `Arc` snapshot,
/// so a `reload` never blocks a classification in flight; the swap is the
/// only writer section.
#[derive(Clone)]
pub struct PatternService {
    current: Arc<RwLock<Arc<PatternSet>>>,
}

impl PatternService {
    pub fn new(set: PatternSet) -> Self {
        PatternService {
            current: Arc::new(RwLock::new(Arc::new(set))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, PatternFileError> {
        let file = PatternFile::from_toml(content)?;
        Ok(Self::new(PatternSet::compile(file.version, file.patterns)))
    }

    pub fn current(&self) -> Arc<PatternSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reload(&self, set: PatternSet) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(set);
    }
}
