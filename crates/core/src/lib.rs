pub mod account;
pub mod decision;
pub mod escalation;
pub mod invoice;
pub mod money;
pub mod tenant;
pub mod transaction;

pub use account::{AccountCode, CategoryCandidate, FALLBACK_EXPENSE, FALLBACK_INCOME};
pub use decision::{Decision, DecisionAction, DecisionRecord, RankedAlternative};
pub use escalation::{EscalationKind, EscalationRecord, EscalationStatus};
pub use invoice::{InvoiceCandidate, InvoiceStatus};
pub use money::Money;
pub use tenant::TenantId;
pub use transaction::{BankTransaction, Direction};
