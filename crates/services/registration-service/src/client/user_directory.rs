//! Persisted user lookup and creation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{RegistrationProfile, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Narrow view of the user repository needed by the registration workflow.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a persisted user by normalized email
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persist a confirmed registration.
    ///
    /// Fails with `Conflict` if the email is already taken, `Persistence` otherwise.
    async fn create(&self, profile: RegistrationProfile) -> AppResult<User>;
}

/// Process-local user directory, used when no database is configured.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Number of persisted users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().get(email).cloned())
    }

    async fn create(&self, profile: RegistrationProfile) -> AppResult<User> {
        let mut users = self.users.write();
        if users.contains_key(&profile.email) {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let user = User::from_profile(Uuid::new_v4(), profile, chrono::Utc::now());
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}
