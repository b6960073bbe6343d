use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Voided,
}

impl InvoiceStatus {
    /// Open invoices can still receive payment allocations.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "Draft"),
            InvoiceStatus::Sent => write!(f, "Sent"),
            InvoiceStatus::PartiallyPaid => write!(f, "PartiallyPaid"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Overdue => write!(f, "Overdue"),
            InvoiceStatus::Voided => write!(f, "Voided"),
        }
    }
}

/// A read-only snapshot of an outstanding invoice, supplied per call.
/// The engine holds no candidate state across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceCandidate {
    pub id: String,
    /// The human-facing identifier, e.g. "INV-00123".
    pub number: String,
    pub counterparty: String,
    pub total_cents: i64,
    pub allocated_cents: i64,
    pub status: InvoiceStatus,
}

impl InvoiceCandidate {
    pub fn outstanding_cents(&self) -> i64 {
        self.total_cents - self.allocated_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_statuses() {
        assert!(InvoiceStatus::Sent.is_open());
        assert!(InvoiceStatus::PartiallyPaid.is_open());
        assert!(InvoiceStatus::Overdue.is_open());
        assert!(!InvoiceStatus::Draft.is_open());
        assert!(!InvoiceStatus::Paid.is_open());
        assert!(!InvoiceStatus::Voided.is_open());
    }

    #[test]
    fn outstanding_is_total_minus_allocated() {
        let invoice = InvoiceCandidate {
            id: "inv-1".to_string(),
            number: "INV-0001".to_string(),
            counterparty: "Acme".to_string(),
            total_cents: 10_000,
            allocated_cents: 2_500,
            status: InvoiceStatus::PartiallyPaid,
        };
        assert_eq!(invoice.outstanding_cents(), 7_500);
    }
}
