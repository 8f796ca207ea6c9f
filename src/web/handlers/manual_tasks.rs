//! # Manual Task Handlers
//!
//! POST answers as soon as the enrollment is registered and the process is
//! spawned; it never waits for the ETL job to finish.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ExternalTask;
use crate::orchestration::parse_compact_date;
use crate::web::errors::ApiResult;
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ManualRunRequest {
    pub entity_id: i64,
    /// `YYYYMMDD`
    pub date_from: Option<String>,
    /// `YYYYMMDD`
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualRunAccepted {
    pub task_id: String,
    pub entity_id: i64,
    pub launched_at: DateTime<Utc>,
}

/// Launch a manual ETL run: POST /v1/manual/tasks
pub async fn launch_manual(
    State(state): State<AppState>,
    Json(request): Json<ManualRunRequest>,
) -> ApiResult<(StatusCode, Json<ManualRunAccepted>)> {
    let date_from = request
        .date_from
        .as_deref()
        .map(parse_compact_date)
        .transpose()?;
    let date_to = request
        .date_to
        .as_deref()
        .map(parse_compact_date)
        .transpose()?;

    let handle = state
        .launcher
        .launch_manual(request.entity_id, date_from, date_to)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ManualRunAccepted {
            task_id: handle.task_id,
            entity_id: handle.farm_id,
            launched_at: handle.launched_at,
        }),
    ))
}

/// Manual tasks whose process is still running: GET /v1/manual/tasks
pub async fn list_active_tasks(State(state): State<AppState>) -> Json<Vec<ExternalTask>> {
    Json(state.launcher.active_tasks())
}
