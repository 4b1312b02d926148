// Read-only views and notifications for the rendering layer

use serde::Serialize;
use std::sync::Arc;

use super::{ActionKind, ActionOutcome, ActionState, MetricSample, Unit};

/// One row of the dashboard: the unit plus what the UI needs to render it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitView {
    #[serde(flatten)]
    pub unit: Arc<Unit>,
    pub display_name: String,
    /// Kind of the in-flight action, if any; drives button disablement.
    pub pending: Option<ActionKind>,
    pub latest_sample: Option<MetricSample>,
}

/// Engine notifications, published on a broadcast channel (toast-equivalent).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    #[serde(rename_all = "camelCase")]
    InventoryUpdated { unit_count: usize, removed: Vec<String> },
    #[serde(rename_all = "camelCase")]
    InventoryFailed { error: String },
    #[serde(rename_all = "camelCase")]
    ActionStarted { unit_id: String, kind: ActionKind },
    #[serde(rename_all = "camelCase")]
    ActionResolved {
        unit_id: String,
        kind: ActionKind,
        state: ActionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UnitCreated { image: String },
}

impl EngineEvent {
    pub fn resolved(unit_id: &str, kind: ActionKind, outcome: &ActionOutcome) -> Self {
        let reason = match outcome {
            ActionOutcome::Succeeded => None,
            ActionOutcome::Failed(reason) => Some(reason.clone()),
        };
        EngineEvent::ActionResolved {
            unit_id: unit_id.to_string(),
            kind,
            state: outcome.state(),
            reason,
        }
    }
}
