//! State machines for Asset Depot entities
//!
//! Each state machine defines:
//! - Valid states (the persisted status enums)
//! - Events that trigger transitions
//! - Terminal states
//!
//! Entities never assign a status directly; they go through `transition`.

use serde::{Deserialize, Serialize};

pub use depot_common::StateError;

// ============================================================================
// Changelist State Machine
// ============================================================================

/// Changelist status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "changelist_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangelistStatus {
    #[default]
    Open,
    PendingReview,
    Submitted,
    Cancelled,
}

impl ChangelistStatus {
    /// Items, shelves and metadata may only change in these states
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Open | Self::PendingReview)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PendingReview => "pending_review",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ChangelistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelistEvent {
    RequestReview,
    Submit,
    Cancel,
}

impl std::fmt::Display for ChangelistEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestReview => write!(f, "request_review"),
            Self::Submit => write!(f, "submit"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

pub struct ChangelistStateMachine;

impl ChangelistStateMachine {
    pub fn transition(
        current: ChangelistStatus,
        event: ChangelistEvent,
    ) -> Result<ChangelistStatus, StateError> {
        // Re-submitting an already submitted changelist refreshes notes only
        if current == ChangelistStatus::Submitted && event == ChangelistEvent::Submit {
            return Ok(ChangelistStatus::Submitted);
        }

        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (
                ChangelistStatus::Open | ChangelistStatus::PendingReview,
                ChangelistEvent::RequestReview,
            ) => ChangelistStatus::PendingReview,
            (
                ChangelistStatus::Open | ChangelistStatus::PendingReview,
                ChangelistEvent::Submit,
            ) => ChangelistStatus::Submitted,
            (
                ChangelistStatus::Open | ChangelistStatus::PendingReview,
                ChangelistEvent::Cancel,
            ) => ChangelistStatus::Cancelled,
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }
}

// ============================================================================
// Branch Merge State Machine
// ============================================================================

/// Branch merge status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "merge_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    #[default]
    Pending,
    Merged,
    Conflicted,
    Cancelled,
}

impl MergeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Merged => "merged",
            Self::Conflicted => "conflicted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEvent {
    Complete,
    Conflict,
    Reopen,
    Cancel,
}

impl MergeEvent {
    /// The event an operator requests by asking for `target` status
    pub fn for_status(target: MergeStatus) -> Self {
        match target {
            MergeStatus::Pending => Self::Reopen,
            MergeStatus::Merged => Self::Complete,
            MergeStatus::Conflicted => Self::Conflict,
            MergeStatus::Cancelled => Self::Cancel,
        }
    }
}

impl std::fmt::Display for MergeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Conflict => write!(f, "conflict"),
            Self::Reopen => write!(f, "reopen"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

pub struct MergeStateMachine;

impl MergeStateMachine {
    pub fn transition(current: MergeStatus, event: MergeEvent) -> Result<MergeStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (_, MergeEvent::Complete) => MergeStatus::Merged,
            (_, MergeEvent::Conflict) => MergeStatus::Conflicted,
            (_, MergeEvent::Reopen) => MergeStatus::Pending,
            (MergeStatus::Pending | MergeStatus::Conflicted, MergeEvent::Cancel) => {
                MergeStatus::Cancelled
            }
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }
}

// ============================================================================
// Merge Job State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "merge_job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MergeJobType {
    AutoIntegrate,
    ConflictStaging,
    SubmitGate,
}

impl MergeJobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoIntegrate => "auto_integrate",
            Self::ConflictStaging => "conflict_staging",
            Self::SubmitGate => "submit_gate",
        }
    }
}

impl std::fmt::Display for MergeJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge job status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "merge_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MergeJobStatus {
    #[default]
    Queued,
    Running,
    Staged,
    Completed,
    Failed,
}

impl MergeJobStatus {
    /// Jobs in these states hold a merge open
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Queued | Self::Running | Self::Staged)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Staged => "staged",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MergeJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeJobEvent {
    /// Executor claim, only valid through the store's conditional update
    Claim,
    Succeed,
    Fail,
    Stage,
    /// Controlled re-run
    Requeue,
}

impl MergeJobEvent {
    /// The event an operator requests by asking for `target` status.
    ///
    /// `running` is reserved for the executor claim.
    pub fn for_status(target: MergeJobStatus) -> Option<Self> {
        match target {
            MergeJobStatus::Queued => Some(Self::Requeue),
            MergeJobStatus::Running => None,
            MergeJobStatus::Staged => Some(Self::Stage),
            MergeJobStatus::Completed => Some(Self::Succeed),
            MergeJobStatus::Failed => Some(Self::Fail),
        }
    }
}

impl std::fmt::Display for MergeJobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claim => write!(f, "claim"),
            Self::Succeed => write!(f, "succeed"),
            Self::Fail => write!(f, "fail"),
            Self::Stage => write!(f, "stage"),
            Self::Requeue => write!(f, "requeue"),
        }
    }
}

pub struct MergeJobStateMachine;

impl MergeJobStateMachine {
    pub fn transition(
        current: MergeJobStatus,
        event: MergeJobEvent,
    ) -> Result<MergeJobStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, event) {
            (MergeJobStatus::Queued, MergeJobEvent::Claim) => MergeJobStatus::Running,
            (MergeJobStatus::Queued, MergeJobEvent::Stage) => MergeJobStatus::Staged,

            (MergeJobStatus::Running | MergeJobStatus::Staged, MergeJobEvent::Succeed) => {
                MergeJobStatus::Completed
            }
            (MergeJobStatus::Running | MergeJobStatus::Staged, MergeJobEvent::Fail) => {
                MergeJobStatus::Failed
            }

            (MergeJobStatus::Staged | MergeJobStatus::Failed, MergeJobEvent::Requeue) => {
                MergeJobStatus::Queued
            }

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    pub fn can_transition(current: MergeJobStatus, event: MergeJobEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
