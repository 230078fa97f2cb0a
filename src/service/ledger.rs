use crate::db::ReminderStorage;
use crate::error::MedminderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// Another writer recorded the same (medication, ledger key) first.
    AlreadyPresent,
}

/// Durable record of which (medication, ledger key) pairs were already notified.
#[derive(Clone)]
pub struct DedupLedger {
    storage: ReminderStorage,
}

impl DedupLedger {
    pub fn new(storage: ReminderStorage) -> Self {
        Self { storage }
    }

    pub async fn already_sent(
        &self,
        medication_id: i64,
        ledger_key: &str,
    ) -> Result<bool, MedminderError> {
        self.storage
            .notification_exists(medication_id, ledger_key)
            .await
    }

    pub async fn record(
        &self,
        medication_id: i64,
        ledger_key: &str,
    ) -> Result<RecordOutcome, MedminderError> {
        let inserted = self
            .storage
            .insert_notification(medication_id, ledger_key)
            .await
            .map_err(MedminderError::LedgerWrite)?;
        Ok(if inserted {
            RecordOutcome::Inserted
        } else {
            RecordOutcome::AlreadyPresent
        })
    }
}
