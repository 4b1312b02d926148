// REST handlers: snapshots, actions, create, manual refresh

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::AppState;
use crate::error::ActionError;
use crate::filter::UnitFilter;
use crate::models::{ActionKind, ActionPayload, CreateUnitRequest};
use crate::version::{NAME, VERSION};

/// JSON error body `{success: false, message}` with a status code.
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "success": false, "message": self.1 })),
        )
            .into_response()
    }
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        let status = match &e {
            ActionError::Conflict(_) => StatusCode::CONFLICT,
            ActionError::UnitGone(_) => StatusCode::NOT_FOUND,
            ActionError::Failed { .. } => StatusCode::BAD_GATEWAY,
            ActionError::CreateFailed(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError(status, e.reason())
    }
}

fn unit_not_found(id: &str) -> ApiError {
    ApiError(StatusCode::NOT_FOUND, format!("unit {} not found", id))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/stats: engine counters.
pub(super) async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.stats().await)
}

/// GET /api/units?q=&status=&port=: filtered inventory in server order.
pub(super) async fn list_units_handler(
    State(state): State<AppState>,
    Query(filter): Query<UnitFilter>,
) -> Result<impl IntoResponse, ApiError> {
    filter
        .validate()
        .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(state.engine.views(&filter).await))
}

pub(super) async fn unit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.engine.view(&id).await.ok_or_else(|| unit_not_found(&id))?;
    Ok(Json(view))
}

pub(super) async fn unit_metrics_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.engine.unit(&id).await.is_none() {
        return Err(unit_not_found(&id));
    }
    Ok(Json(state.engine.metrics(&id).await))
}

/// POST /api/units/{id}/actions/{kind}: 409 while another action on the unit is pending.
pub(super) async fn dispatch_action_handler(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: ActionKind = kind
        .parse()
        .map_err(|e: String| ApiError(StatusCode::BAD_REQUEST, e))?;
    let payload = state.engine.dispatch(&id, kind).await?;
    let body = match payload {
        ActionPayload::None => json!({ "success": true }),
        ActionPayload::Logs(logs) => json!({ "success": true, "logs": logs }),
        ActionPayload::Inspect(inspect) => json!({ "success": true, "inspect": inspect }),
    };
    Ok(Json(body))
}

/// POST /api/units: create a unit from an image.
pub(super) async fn create_unit_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUnitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.image.trim().is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "image is required".into()));
    }
    state.engine.create_unit(request).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

/// POST /api/refresh: inventory then metrics, immediately.
pub(super) async fn refresh_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .engine
        .refresh_all()
        .await
        .map_err(|e| ApiError(StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(json!({
        "success": true,
        "sampled": report.sampled.len(),
        "failed": report.failed.len(),
    })))
}
