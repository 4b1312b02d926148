// HTTP + WebSocket surface for the rendering layer

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::sync_engine::SyncEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) engine: Arc<SyncEngine>,
}

pub fn app(engine: Arc<SyncEngine>) -> Router {
    let state = AppState { engine };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats", get(http::stats_handler)) // GET /api/stats
        .route("/api/refresh", post(http::refresh_handler)) // POST /api/refresh
        .route(
            "/api/units",
            get(http::list_units_handler).post(http::create_unit_handler),
        ) // GET, POST /api/units
        .route("/api/units/{id}", get(http::unit_handler)) // GET /api/units/{id}
        .route("/api/units/{id}/metrics", get(http::unit_metrics_handler)) // GET /api/units/{id}/metrics
        .route(
            "/api/units/{id}/actions/{kind}",
            post(http::dispatch_action_handler),
        ) // POST /api/units/{id}/actions/{kind}
        .route("/ws/events", get(ws::ws_events)) // WS /ws/events
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
