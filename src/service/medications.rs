use std::sync::Arc;
use tracing::{info, warn};

use crate::channels::{EmailGateway, SmsGateway};
use crate::db::{Medication, NewMedication, ReminderStorage};
use crate::error::MedminderError;
use crate::service::message;

/// Create, list and delete scheduled medications.
#[derive(Clone)]
pub struct MedicationStore {
    storage: ReminderStorage,
    sms: Arc<dyn SmsGateway>,
    email: Arc<dyn EmailGateway>,
}

impl MedicationStore {
    pub fn new(
        storage: ReminderStorage,
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
    ) -> Self {
        Self {
            storage,
            sms,
            email,
        }
    }

    /// Store the medication, then tell the caretaker (if any) about the new schedule.
    /// A failed notice is logged; the medication stays scheduled.
    pub async fn schedule(
        &self,
        user_id: i64,
        med: NewMedication,
    ) -> Result<Medication, MedminderError> {
        let med = self.storage.insert_medication(user_id, med.normalized()).await?;
        info!(med_id = med.id, user_id, "medication scheduled");

        let sms = async {
            let notice = message::caretaker_schedule_notice(&med.med_name, &med.dosage, &med.time);
            if let Some(phone) = med.caretaker_phone.as_deref()
                && let Err(e) = self.sms.send(phone, &notice).await
            {
                warn!(med_id = med.id, error = %e, "caretaker schedule SMS failed");
            }
        };
        let email = async {
            let notice = message::caretaker_schedule_email(&med.med_name, &med.dosage, &med.time);
            if let Some(to) = med.caretaker_email.as_deref()
                && let Err(e) = self
                    .email
                    .send(to, message::CARETAKER_SUBJECT, &notice)
                    .await
            {
                warn!(med_id = med.id, error = %e, "caretaker schedule email failed");
            }
        };
        tokio::join!(sms, email);

        Ok(med)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Medication>, MedminderError> {
        self.storage.list_medications(user_id).await
    }

    /// Removes the medication and its notification records together.
    pub async fn delete(&self, med_id: i64) -> Result<(), MedminderError> {
        if !self.storage.delete_medication(med_id).await? {
            return Err(MedminderError::MedicationNotFound(med_id));
        }
        info!(med_id, "medication deleted");
        Ok(())
    }
}
