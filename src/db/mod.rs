//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and inputs
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `ReminderStorage`, the only owner of the three tables

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Medication, NewMedication, NewUser, NotificationRecord, ScheduleRow, User};
pub use schema::SQLITE_INIT;
pub use sqlite::{ReminderStorage, SqlitePool};
