// Domain models

mod action;
mod container;
mod event;
mod metrics;

pub use action::{
    ActionKind, ActionOutcome, ActionPayload, ActionRequest, ActionState, CreateUnitRequest,
    HttpMethod,
};
pub use container::{SHORT_ID_LEN, Unit, UnitStatus, short_id};
pub use event::{EngineEvent, UnitView};
pub use metrics::{MetricSample, now_ms};
