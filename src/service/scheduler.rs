use crate::error::MedminderError;
use crate::service::engine::{ReminderEngine, TickSummary};

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    /// A cycle is in progress.
    Running,
    /// Started, waiting for the next tick.
    Idle,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub interval_secs: u64,
    pub ticks_completed: u64,
    pub ticks_failed: u64,
    pub ticks_skipped: u64,
    pub last_summary: Option<TickSummary>,
}

/// Result of a manually requested tick.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TickReport {
    Completed(TickSummary),
    Failed { reason: String },
    /// Another cycle was still running; nothing was started.
    Busy,
}

/// Public messages handled by the scheduler actor.
#[derive(Debug)]
pub enum SchedulerMessage {
    /// Arm the periodic timer. No-op when already started.
    Start(RpcReplyPort<SchedulerStatus>),
    /// Disarm the timer; replies once any in-flight cycle has finished.
    Stop(RpcReplyPort<SchedulerStatus>),
    /// Run one cycle now and reply with its outcome.
    TickNow(RpcReplyPort<TickReport>),
    Status(RpcReplyPort<SchedulerStatus>),

    // Internal messages (sent by the actor itself)
    /// The interval timer fired.
    TimerTick,
    /// A spawned cycle has completed.
    TickFinished {
        result: Result<TickSummary, MedminderError>,
    },
}

/// Handle for interacting with the scheduler actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    actor: ActorRef<SchedulerMessage>,
}

impl SchedulerHandle {
    pub async fn start(&self) -> Result<SchedulerStatus, MedminderError> {
        ractor::call!(self.actor, SchedulerMessage::Start)
            .map_err(|e| MedminderError::RactorError(format!("Start RPC failed: {e}")))
    }

    /// Stop periodic ticks, waiting for the in-flight cycle to finish.
    pub async fn stop(&self) -> Result<SchedulerStatus, MedminderError> {
        ractor::call!(self.actor, SchedulerMessage::Stop)
            .map_err(|e| MedminderError::RactorError(format!("Stop RPC failed: {e}")))
    }

    pub async fn tick_now(&self) -> Result<TickReport, MedminderError> {
        ractor::call!(self.actor, SchedulerMessage::TickNow)
            .map_err(|e| MedminderError::RactorError(format!("TickNow RPC failed: {e}")))
    }

    pub async fn status(&self) -> Result<SchedulerStatus, MedminderError> {
        ractor::call!(self.actor, SchedulerMessage::Status)
            .map_err(|e| MedminderError::RactorError(format!("Status RPC failed: {e}")))
    }

    /// Terminate the actor. Call [`stop`](Self::stop) first for a clean drain.
    pub fn shutdown(&self) {
        self.actor.stop(None);
    }
}

struct SchedulerActorState {
    engine: Arc<ReminderEngine>,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
    in_flight: bool,
    tick_waiters: Vec<RpcReplyPort<TickReport>>,
    stop_waiters: Vec<RpcReplyPort<SchedulerStatus>>,
    ticks_completed: u64,
    ticks_failed: u64,
    ticks_skipped: u64,
    last_summary: Option<TickSummary>,
}

impl SchedulerActorState {
    fn state(&self) -> SchedulerState {
        match (self.in_flight, self.timer.is_some()) {
            (true, _) => SchedulerState::Running,
            (false, true) => SchedulerState::Idle,
            (false, false) => SchedulerState::Stopped,
        }
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state(),
            interval_secs: self.interval.as_secs(),
            ticks_completed: self.ticks_completed,
            ticks_failed: self.ticks_failed,
            ticks_skipped: self.ticks_skipped,
            last_summary: self.last_summary.clone(),
        }
    }
}

/// ractor-based scheduler actor
struct SchedulerActor;

struct SchedulerArgs {
    engine: Arc<ReminderEngine>,
    interval: Duration,
}

#[ractor::async_trait]
impl Actor for SchedulerActor {
    type Msg = SchedulerMessage;
    type State = SchedulerActorState;
    type Arguments = SchedulerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(interval_secs = args.interval.as_secs(), "scheduler ready (stopped)");
        Ok(SchedulerActorState {
            engine: args.engine,
            interval: args.interval,
            timer: None,
            in_flight: false,
            tick_waiters: Vec::new(),
            stop_waiters: Vec::new(),
            ticks_completed: 0,
            ticks_failed: 0,
            ticks_skipped: 0,
            last_summary: None,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        info!("scheduler terminated");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SchedulerMessage::Start(rp) => {
                if state.timer.is_none() {
                    state.timer = Some(spawn_timer(&myself, state.interval));
                    info!(interval_secs = state.interval.as_secs(), "scheduler started");
                }
                let _ = rp.send(state.status());
            }
            SchedulerMessage::Stop(rp) => {
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                    info!("scheduler stopped; no further ticks");
                }
                if state.in_flight {
                    debug!("stop requested during a cycle; replying when it finishes");
                    state.stop_waiters.push(rp);
                } else {
                    let _ = rp.send(state.status());
                }
            }
            SchedulerMessage::TickNow(rp) => {
                if state.in_flight {
                    let _ = rp.send(TickReport::Busy);
                    return Ok(());
                }
                state.tick_waiters.push(rp);
                self.launch_cycle(&myself, state);
            }
            SchedulerMessage::Status(rp) => {
                let _ = rp.send(state.status());
            }
            SchedulerMessage::TimerTick => {
                if state.timer.is_none() {
                    return Ok(());
                }
                if state.in_flight {
                    state.ticks_skipped += 1;
                    warn!("previous cycle still running; skipping this tick");
                    return Ok(());
                }
                self.launch_cycle(&myself, state);
            }
            SchedulerMessage::TickFinished { result } => {
                state.in_flight = false;
                let report = match result {
                    Ok(summary) => {
                        state.ticks_completed += 1;
                        state.last_summary = Some(summary.clone());
                        TickReport::Completed(summary)
                    }
                    Err(e) => {
                        state.ticks_failed += 1;
                        error!(error = %e, "cycle failed; waiting for next interval");
                        TickReport::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                for rp in state.tick_waiters.drain(..) {
                    let _ = rp.send(report.clone());
                }
                let status = state.status();
                for rp in state.stop_waiters.drain(..) {
                    let _ = rp.send(status.clone());
                }
            }
        }
        Ok(())
    }
}

impl SchedulerActor {
    fn launch_cycle(&self, myself: &ActorRef<SchedulerMessage>, state: &mut SchedulerActorState) {
        state.in_flight = true;
        let engine = state.engine.clone();
        let me = myself.clone();

        tokio::spawn(async move {
            let result = match tokio::spawn(async move { engine.run_cycle().await }).await {
                Ok(r) => r,
                Err(e) => Err(MedminderError::RactorError(format!(
                    "cycle task aborted: {e}"
                ))),
            };
            let _ = ractor::cast!(me, SchedulerMessage::TickFinished { result });
        });
    }
}

/// First tick fires one interval after start; later ticks keep the start-to-start period.
fn spawn_timer(myself: &ActorRef<SchedulerMessage>, period: Duration) -> JoinHandle<()> {
    let me = myself.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if ractor::cast!(me, SchedulerMessage::TimerTick).is_err() {
                break;
            }
        }
    })
}

/// Async spawn of the scheduler actor (stopped) and return a handle.
pub async fn spawn(
    engine: Arc<ReminderEngine>,
    interval: Duration,
) -> Result<SchedulerHandle, MedminderError> {
    let (actor, _jh) = Actor::spawn(None, SchedulerActor, SchedulerArgs { engine, interval })
        .await
        .map_err(|e| MedminderError::RactorError(format!("failed to spawn scheduler: {e}")))?;
    Ok(SchedulerHandle { actor })
}
