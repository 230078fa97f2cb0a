pub mod channels;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

pub use error::MedminderError;
pub use service::engine::{ReminderEngine, TickSummary};
pub use service::scheduler::SchedulerHandle;
