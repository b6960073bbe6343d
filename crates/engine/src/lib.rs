pub mod categorizer;
pub mod config;
pub mod matcher;
pub mod patterns;
pub mod signals;
pub mod source;
pub(crate) mod util;

pub use categorizer::{description_quality, Categorizer};
pub use config::{CategorizerConfig, MatcherConfig};
pub use matcher::{classify, score_candidates, EngineError, PaymentMatcher, ScoredCandidate};
pub use patterns::{CategoryPattern, PatternFile, PatternFileError, PatternService, PatternSet};
pub use signals::{amount_score, name_score, reference_score, SignalScore};
pub use source::{AmountProfile, CandidateSource, HistoricalMatch, MemorySource, SourceError};
