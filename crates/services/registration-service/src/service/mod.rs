//! Registration workflow and expiry sweeping.

mod registration_service;
mod sweeper;

pub use registration_service::{NewRegistration, Registrar, RegistrationService, SignupOutcome};
pub use sweeper::{run_sweep, ExpirySweeper, SweeperHandle};

#[cfg(any(test, feature = "test-utils"))]
pub use registration_service::MockRegistrationService;
