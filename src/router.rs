use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::reminders::{
    run_reminders, scheduler_start, scheduler_status, scheduler_stop,
};
use crate::service::engine::ReminderEngine;
use crate::service::scheduler::SchedulerHandle;

#[derive(Clone)]
pub struct MedminderState {
    pub engine: Arc<ReminderEngine>,
    pub scheduler: SchedulerHandle,
    pub admin_key: Arc<str>,
}

impl MedminderState {
    pub fn new(
        engine: Arc<ReminderEngine>,
        scheduler: SchedulerHandle,
        admin_key: Arc<str>,
    ) -> Self {
        Self {
            engine,
            scheduler,
            admin_key,
        }
    }
}

pub fn medminder_router(state: MedminderState) -> Router {
    Router::new()
        .route("/send_reminders", get(run_reminders))
        .route("/admin/reminders/run", post(run_reminders))
        .route("/admin/scheduler", get(scheduler_status))
        .route("/admin/scheduler/start", post(scheduler_start))
        .route("/admin/scheduler/stop", post(scheduler_stop))
        .with_state(state)
}
