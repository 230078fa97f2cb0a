#![allow(dead_code)]

use async_trait::async_trait;
use medminder::channels::{EmailGateway, SmsGateway};
use medminder::config::{Recurrence, SchedulerConfig};
use medminder::db::{Medication, NewMedication, NewUser, ReminderStorage, User};
use medminder::service::accounts::AccountStore;
use medminder::service::medications::MedicationStore;
use medminder::service::scanner::{DueReminder, ReminderScanner};
use medminder::{MedminderError, ReminderEngine};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh SQLite file that is removed when dropped.
pub struct TempDb {
    pub storage: ReminderStorage,
    path: PathBuf,
}

impl TempDb {
    pub async fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "medminder-{tag}-{}-{}-{}.sqlite",
            std::process::id(),
            nanos,
            DB_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let database_url = format!("sqlite:{}", path.display());
        let storage = ReminderStorage::connect(&database_url)
            .await
            .expect("failed to open test database");
        Self { storage, path }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSms {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, phone: &str) -> usize {
        self.sent().iter().filter(|(to, _)| to == phone).count()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, to_phone: &str, body: &str) -> Result<(), MedminderError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MedminderError::Sms {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "gateway down".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_phone.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEmail {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingEmail {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, email: &str) -> usize {
        self.sent().iter().filter(|(to, _, _)| to == email).count()
    }
}

#[async_trait]
impl EmailGateway for RecordingEmail {
    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), MedminderError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MedminderError::Email("SMTP send: connection refused".to_string()));
        }
        self.sent.lock().unwrap().push((
            to_email.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

/// Everything a reminder test needs, wired over one temp database.
pub struct Harness {
    pub db: TempDb,
    pub sms: Arc<RecordingSms>,
    pub email: Arc<RecordingEmail>,
    pub engine: Arc<ReminderEngine>,
    pub accounts: AccountStore,
    pub medications: MedicationStore,
}

impl Harness {
    pub async fn new(tag: &str) -> Self {
        Self::with_config(tag, SchedulerConfig::default()).await
    }

    pub async fn with_config(tag: &str, cfg: SchedulerConfig) -> Self {
        let db = TempDb::new(tag).await;
        let sms = RecordingSms::new();
        let email = RecordingEmail::new();
        let engine = Arc::new(ReminderEngine::build(
            db.storage.clone(),
            sms.clone(),
            email.clone(),
            &cfg,
        ));
        let accounts = AccountStore::new(db.storage.clone());
        let medications = MedicationStore::new(db.storage.clone(), sms.clone(), email.clone());
        Self {
            db,
            sms,
            email,
            engine,
            accounts,
            medications,
        }
    }

    pub async fn user(&self, email: &str, phone: &str) -> User {
        self.accounts
            .register(NewUser {
                name: "Pat".to_string(),
                phone: phone.to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("register user")
    }

    /// Schedule without going through the caretaker notice, so send counts stay clean.
    pub async fn medication(&self, user_id: i64, med: NewMedication) -> Medication {
        self.db
            .storage
            .insert_medication(user_id, med.normalized())
            .await
            .expect("insert medication")
    }

    /// The reminder the scanner would produce for `med_id` right now.
    pub async fn due_for(&self, med_id: i64) -> DueReminder {
        ReminderScanner::new(self.db.storage.clone(), Recurrence::Once)
            .scan()
            .await
            .expect("scan")
            .into_iter()
            .find(|d| d.medication_id == med_id)
            .expect("medication is due")
    }

    pub async fn notification_count(&self) -> i64 {
        self.db.storage.count_notifications().await.unwrap()
    }
}

pub fn aspirin() -> NewMedication {
    NewMedication {
        med_name: "Aspirin".to_string(),
        dosage: "100mg".to_string(),
        time: "08:00".to_string(),
        caretaker_phone: None,
        caretaker_email: None,
    }
}

pub fn with_caretaker(mut med: NewMedication) -> NewMedication {
    med.caretaker_phone = Some("+15559876543".to_string());
    med.caretaker_email = Some("carer@example.com".to_string());
    med
}
