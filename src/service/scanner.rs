use chrono::{Local, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Recurrence;
use crate::db::{ReminderStorage, ScheduleRow};
use crate::error::MedminderError;

/// A scheduled medication eligible for notification in the current tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueReminder {
    pub medication_id: i64,
    pub med_name: String,
    pub dosage: String,
    pub due_time: String,
    pub user_phone: String,
    pub user_email: String,
    pub caretaker_phone: Option<String>,
    pub caretaker_email: Option<String>,
    /// Value recorded as `notifications.sent_time` for this reminder.
    pub ledger_key: String,
}

#[derive(Clone)]
pub struct ReminderScanner {
    storage: ReminderStorage,
    recurrence: Recurrence,
}

impl ReminderScanner {
    pub fn new(storage: ReminderStorage, recurrence: Recurrence) -> Self {
        Self {
            storage,
            recurrence,
        }
    }

    pub async fn scan(&self) -> Result<Vec<DueReminder>, MedminderError> {
        self.scan_at(Local::now().naive_local()).await
    }

    /// Read every medication with its owner in one snapshot and compute the due set.
    pub async fn scan_at(&self, now: NaiveDateTime) -> Result<Vec<DueReminder>, MedminderError> {
        let rows = self.storage.load_schedule().await?;
        let total = rows.len();

        let due: Vec<DueReminder> = rows
            .into_iter()
            .filter_map(|row| {
                let ledger_key = ledger_key(self.recurrence, &row.time, now)?;
                Some(DueReminder::from_row(row, ledger_key))
            })
            .collect();

        debug!(total, due = due.len(), "scan complete");
        Ok(due)
    }
}

/// `None` means the medication is not due yet at `now`.
fn ledger_key(recurrence: Recurrence, due_time: &str, now: NaiveDateTime) -> Option<String> {
    match recurrence {
        Recurrence::Once => Some(due_time.to_string()),
        Recurrence::Daily => {
            let Ok(at) = NaiveTime::parse_from_str(due_time.trim(), "%H:%M") else {
                warn!(due_time, "unparseable due time; skipping under daily recurrence");
                return None;
            };
            (now.time() >= at)
                .then(|| format!("{} {}", now.format("%Y-%m-%d"), at.format("%H:%M")))
        }
    }
}

impl DueReminder {
    fn from_row(row: ScheduleRow, ledger_key: String) -> Self {
        Self {
            medication_id: row.medication_id,
            med_name: row.med_name,
            dosage: row.dosage,
            due_time: row.time,
            user_phone: row.phone,
            user_email: row.email,
            caretaker_phone: crate::db::models::non_blank(row.caretaker_phone),
            caretaker_email: crate::db::models::non_blank(row.caretaker_email),
            ledger_key,
        }
    }
}
