use axum::{Json, extract::State};
use serde::Serialize;
use tracing::info;

use crate::middleware::RequireAdminKey;
use crate::service::engine::TickSummary;
use crate::service::scheduler::SchedulerStatus;
use crate::{MedminderError, router::MedminderState};

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub ok: bool,
    pub summary: TickSummary,
}

/// GET /send_reminders, POST /admin/reminders/run -> run one scan+dispatch cycle now.
pub async fn run_reminders(
    _auth: RequireAdminKey,
    State(state): State<MedminderState>,
) -> Result<Json<RunResponse>, MedminderError> {
    info!("manual reminder cycle requested");
    let summary = state.engine.run_cycle().await?;
    Ok(Json(RunResponse { ok: true, summary }))
}

/// GET /admin/scheduler
pub async fn scheduler_status(
    _auth: RequireAdminKey,
    State(state): State<MedminderState>,
) -> Result<Json<SchedulerStatus>, MedminderError> {
    Ok(Json(state.scheduler.status().await?))
}

/// POST /admin/scheduler/start
pub async fn scheduler_start(
    _auth: RequireAdminKey,
    State(state): State<MedminderState>,
) -> Result<Json<SchedulerStatus>, MedminderError> {
    Ok(Json(state.scheduler.start().await?))
}

/// POST /admin/scheduler/stop
pub async fn scheduler_stop(
    _auth: RequireAdminKey,
    State(state): State<MedminderState>,
) -> Result<Json<SchedulerStatus>, MedminderError> {
    Ok(Json(state.scheduler.stop().await?))
}
