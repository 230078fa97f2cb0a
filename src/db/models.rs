use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Registration input. The hash is produced by the caller; it is stored as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Medication {
    pub id: i64,
    pub user_id: i64,
    pub med_name: String,
    pub dosage: String,
    pub time: String,
    pub caretaker_phone: Option<String>,
    pub caretaker_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedication {
    pub med_name: String,
    pub dosage: String,
    pub time: String,
    #[serde(default)]
    pub caretaker_phone: Option<String>,
    #[serde(default)]
    pub caretaker_email: Option<String>,
}

impl NewMedication {
    /// Forms submit blank caretaker fields; those mean "no caretaker".
    pub fn normalized(mut self) -> Self {
        self.caretaker_phone = non_blank(self.caretaker_phone);
        self.caretaker_email = non_blank(self.caretaker_email);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub med_id: i64,
    pub sent_time: String,
}

/// One row of the medications/users join read by the scanner.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScheduleRow {
    pub medication_id: i64,
    pub med_name: String,
    pub dosage: String,
    pub time: String,
    pub phone: String,
    pub email: String,
    pub caretaker_phone: Option<String>,
    pub caretaker_email: Option<String>,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
