//! SQL DDL for initializing the reminder storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `users.email` UNIQUE, so one account per address
/// - medications and notifications cascading from their parent row
/// - `notifications(med_id, sent_time)` UNIQUE: the dedup ledger invariant,
///   at most one record per medication and ledger key
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    med_name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    time TEXT NOT NULL, -- HH:MM, recurs daily
    caretaker_phone TEXT NULL,
    caretaker_email TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_medications_user_id ON medications(user_id);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    med_id INTEGER NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
    sent_time TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_notifications_med_sent
    ON notifications(med_id, sent_time);
"#;
