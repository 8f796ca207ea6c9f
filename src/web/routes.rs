//! # Web API Route Definitions

use axum::routing::{get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// All v1 routes, prefixed with `/v1` by [`app`]
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/runs", post(handlers::pipeline::trigger_run))
        .route("/pipeline/runs", get(handlers::pipeline::list_runs))
        .route("/pipeline/runs/:run_id", get(handlers::pipeline::get_run))
        .route("/manual/tasks", post(handlers::manual_tasks::launch_manual))
        .route("/manual/tasks", get(handlers::manual_tasks::list_active_tasks))
}

/// Complete application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .nest("/v1", api_v1_routes())
        .with_state(state)
}
