//! Application state for dependency injection.

use std::sync::Arc;

use crate::infra::Database;
use crate::service::RegistrationService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<dyn RegistrationService>,
    /// Present when users are persisted in Postgres
    pub database: Option<Database>,
}

impl AppState {
    /// Create new app state.
    pub fn new(registration: Arc<dyn RegistrationService>, database: Option<Database>) -> Self {
        Self {
            registration,
            database,
        }
    }
}
