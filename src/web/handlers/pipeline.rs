//! # Pipeline Run Handlers
//!
//! Scheduled runs are fire-and-forget from the caller's side: the POST answers
//! `202 Accepted` with the run id and the pipeline continues detached.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::constants::PeriodKind;
use crate::models::PipelineRun;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub period_kind: PeriodKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunAccepted {
    pub run_id: Uuid,
    pub period_kind: PeriodKind,
}

/// Trigger a scheduled run: POST /v1/pipeline/runs
pub async fn trigger_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> (StatusCode, Json<RunAccepted>) {
    let run_id = state.coordinator.trigger(request.period_kind);
    info!(run_id = %run_id, period_kind = %request.period_kind, "Pipeline run accepted");

    (
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id,
            period_kind: request.period_kind,
        }),
    )
}

/// Recently ended runs, newest first: GET /v1/pipeline/runs
pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<PipelineRun>> {
    Json(state.coordinator.recent_runs())
}

/// One ended run: GET /v1/pipeline/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    state
        .coordinator
        .find_run(run_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound {
            message: format!("Pipeline run {run_id} not found or still running"),
        })
}
