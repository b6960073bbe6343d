use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tenant::TenantId;

/// Autonomy tier chosen for one classified transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    /// Act without human review.
    AutoApply,
    /// Queue for human review.
    ReviewRequired,
    /// No candidate cleared the floor; do nothing.
    NoMatch,
}

/// A runner-up candidate presented alongside the chosen one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub candidate_id: String,
    pub confidence: u8,
}

/// The engine's answer for one transaction. Built once per invocation,
/// handed to the caller and to the audit log, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub tenant: TenantId,
    pub subject_id: String,
    pub chosen_candidate: Option<String>,
    pub confidence: u8,
    pub action: DecisionAction,
    pub reasoning: String,
    pub alternatives: Vec<RankedAlternative>,
}

impl Decision {
    pub fn auto_applied(&self) -> bool {
        self.action == DecisionAction::AutoApply
    }
}

/// Append-only audit record derived from a `Decision`. Write-once: the log
/// it lands in is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub tenant: TenantId,
    pub subject_id: String,
    pub action: DecisionAction,
    pub confidence: u8,
    pub auto_applied: bool,
    pub reasoning: String,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn from_decision(decision: &Decision) -> Self {
        DecisionRecord {
            id: Uuid::new_v4(),
            tenant: decision.tenant.clone(),
            subject_id: decision.subject_id.clone(),
            action: decision.action,
            confidence: decision.confidence,
            auto_applied: decision.auto_applied(),
            reasoning: decision.reasoning.clone(),
            recorded_at: Utc::now(),
        }
    }
}
