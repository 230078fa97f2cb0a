use crate::db::models::{
    Medication, NewMedication, NewUser, NotificationRecord, ScheduleRow, User,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::MedminderError;
use backon::{ExponentialBuilder, Retryable};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct ReminderStorage {
    pool: SqlitePool,
}

impl ReminderStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, MedminderError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_opts)
            .await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Same as [`connect`](Self::connect), retrying transient failures at startup.
    pub async fn connect_with_retry(database_url: &str) -> Result<Self, MedminderError> {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(5)
            .with_jitter();

        (|| async { Self::connect(database_url).await })
            .retry(retry_policy)
            .notify(|err, dur: Duration| {
                warn!(error = %err, "opening database failed, retrying in {:?}", dur);
            })
            .await
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), MedminderError> {
        // execute multiple statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn insert_user(&self, user: NewUser) -> Result<User, MedminderError> {
        let email = user.email.clone();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, phone, email, password_hash)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, phone, email, password_hash"#,
        )
        .bind(user.name)
        .bind(user.phone)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match MedminderError::from(e) {
            err if err.is_unique_violation() => MedminderError::EmailAlreadyRegistered(email),
            err => err,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, MedminderError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, phone, email, password_hash FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, MedminderError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, phone, email, password_hash FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn insert_medication(
        &self,
        user_id: i64,
        med: NewMedication,
    ) -> Result<Medication, MedminderError> {
        let row = sqlx::query_as::<_, Medication>(
            r#"INSERT INTO medications
                   (user_id, med_name, dosage, time, caretaker_phone, caretaker_email)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id, user_id, med_name, dosage, time, caretaker_phone, caretaker_email"#,
        )
        .bind(user_id)
        .bind(med.med_name)
        .bind(med.dosage)
        .bind(med.time)
        .bind(med.caretaker_phone)
        .bind(med.caretaker_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_medications(&self, user_id: i64) -> Result<Vec<Medication>, MedminderError> {
        let rows = sqlx::query_as::<_, Medication>(
            r#"SELECT id, user_id, med_name, dosage, time, caretaker_phone, caretaker_email
               FROM medications WHERE user_id = ? ORDER BY id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a medication and its notification records in one transaction.
    /// Returns false when no such medication existed.
    pub async fn delete_medication(&self, id: i64) -> Result<bool, MedminderError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notifications WHERE med_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM medications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Every medication joined with its owner, read inside a single transaction.
    pub async fn load_schedule(&self) -> Result<Vec<ScheduleRow>, MedminderError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, ScheduleRow>(
            r#"SELECT m.id AS medication_id, m.med_name, m.dosage, m.time,
                      u.phone, u.email, m.caretaker_phone, m.caretaker_email
               FROM medications m
               INNER JOIN users u ON m.user_id = u.id
               ORDER BY m.id"#,
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn notification_exists(
        &self,
        med_id: i64,
        sent_time: &str,
    ) -> Result<bool, MedminderError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM notifications WHERE med_id = ? AND sent_time = ?")
                .bind(med_id)
                .bind(sent_time)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Insert a ledger row. Returns false if the (med_id, sent_time) row already existed.
    pub async fn insert_notification(
        &self,
        med_id: i64,
        sent_time: &str,
    ) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query(
            r#"INSERT INTO notifications (med_id, sent_time) VALUES (?, ?)
               ON CONFLICT(med_id, sent_time) DO NOTHING"#,
        )
        .bind(med_id)
        .bind(sent_time)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    pub async fn list_notifications(
        &self,
        med_id: i64,
    ) -> Result<Vec<NotificationRecord>, MedminderError> {
        let rows = sqlx::query_as::<_, NotificationRecord>(
            "SELECT id, med_id, sent_time FROM notifications WHERE med_id = ? ORDER BY id",
        )
        .bind(med_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_notifications(&self) -> Result<i64, MedminderError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
