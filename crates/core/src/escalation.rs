use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tenant::TenantId;

/// Why a decision was handed to a human instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationKind {
    AmbiguousMatch,
    LowConfidence,
    PatternFlagged,
    AmountExceedsMaximum,
}

/// Escalations are raised `Pending`; the review workflow resolves them
/// outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: Uuid,
    pub tenant: TenantId,
    pub subject_id: String,
    pub kind: EscalationKind,
    pub reason: String,
    pub candidate_ids: Vec<String>,
    pub status: EscalationStatus,
    pub raised_at: DateTime<Utc>,
}

impl EscalationRecord {
    pub fn pending(
        tenant: TenantId,
        subject_id: impl Into<String>,
        kind: EscalationKind,
        reason: impl Into<String>,
        candidate_ids: Vec<String>,
    ) -> Self {
        EscalationRecord {
            id: Uuid::new_v4(),
            tenant,
            subject_id: subject_id.into(),
            kind,
            reason: reason.into(),
            candidate_ids,
            status: EscalationStatus::Pending,
            raised_at: Utc::now(),
        }
    }
}
