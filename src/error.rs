// Error taxonomy: refresh failures, action failures, dispatch conflicts

use thiserror::Error;

use crate::models::ActionKind;

/// Inventory or metrics refresh failed. Never fatal: prior state is kept and the next tick retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("server reported failure: {0}")]
    Rejected(String),
}

/// A second dispatch for a unit that already has a pending action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unit {unit_id} already has a pending {pending} action")]
pub struct ConflictError {
    pub unit_id: String,
    pub pending: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error("{kind} failed: {reason}")]
    Failed { kind: ActionKind, reason: String },
    #[error("unit {0} no longer exists")]
    UnitGone(String),
    #[error("create failed: {0}")]
    CreateFailed(String),
}

impl ActionError {
    /// Human-readable reason suitable for a toast.
    pub fn reason(&self) -> String {
        match self {
            ActionError::Failed { reason, .. } | ActionError::CreateFailed(reason) => {
                reason.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
