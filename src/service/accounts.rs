use tracing::info;

use crate::db::{NewUser, ReminderStorage, User};
use crate::error::MedminderError;

/// Registration and lookup of account rows. Credential checks live with the caller.
#[derive(Clone)]
pub struct AccountStore {
    storage: ReminderStorage,
}

impl AccountStore {
    pub fn new(storage: ReminderStorage) -> Self {
        Self { storage }
    }

    /// Fails with `EmailAlreadyRegistered` when the address is taken.
    pub async fn register(&self, user: NewUser) -> Result<User, MedminderError> {
        let user = self.storage.insert_user(user).await?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, MedminderError> {
        self.storage.get_user(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, MedminderError> {
        self.storage.find_user_by_email(email).await
    }
}
