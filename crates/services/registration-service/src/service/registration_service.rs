//! Registration workflow - Staged signup confirmed by an emailed code.
//!
//! Per email the workflow moves `NONE -> PENDING -> (VERIFIED | EXPIRED | CANCELLED)`.
//! The pending store is the only place staged registrations live; collaborators
//! (user directory, notifier) never touch it and are never called while a
//! store lock is held.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::client::{Notifier, UserDirectory};
use crate::code::CodeGenerator;
use crate::service::sweeper::run_sweep;
use crate::store::{PendingLookup, PendingRegistrationStore, Removal, SweepReport};
use common::{AppError, AppResult, RegistrationConfig};
use domain::{
    mask_phone, normalize_email, FarmerDetails, HerderDetails, Password, RegistrationProfile,
    RoleAttributes, StagedRegistration, User, UserRole,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const NO_PENDING_REGISTRATION: &str = "No pending registration found for this email";

/// Signup input as submitted by the caller.
#[derive(Clone, Default)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password: String,
    pub role: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    /// Only kept when the role is FARMER
    pub farmer: FarmerDetails,
    /// Only kept when the role is HERDER
    pub herder: HerderDetails,
}

impl std::fmt::Debug for NewRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewRegistration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number.as_deref().map(mask_phone))
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Result of a successful signup
#[derive(Debug, Clone, Serialize)]
pub struct SignupOutcome {
    /// Normalized email the code was sent to
    pub email: String,
}

/// Registration workflow trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RegistrationService: Send + Sync {
    /// Stage a registration and email a verification code
    async fn signup(&self, input: NewRegistration) -> AppResult<SignupOutcome>;

    /// Confirm a staged registration and persist the user
    async fn verify_code(&self, email: &str, code: &str) -> AppResult<User>;

    /// Replace the code of a staged registration and email it again
    async fn resend_code(&self, email: &str) -> AppResult<()>;

    /// Drop any staged registration for the email
    async fn cancel_registration(&self, email: &str) -> AppResult<Removal>;

    /// Evict expired registrations now
    fn trigger_sweep(&self) -> SweepReport;

    /// Number of staged registrations, expired ones included until swept
    fn pending_count(&self) -> usize;
}

/// Concrete workflow over the pending store and injected collaborators.
pub struct Registrar {
    store: Arc<PendingRegistrationStore>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    codes: Arc<dyn CodeGenerator>,
    config: RegistrationConfig,
}

impl Registrar {
    pub fn new(
        store: Arc<PendingRegistrationStore>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        codes: Arc<dyn CodeGenerator>,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            store,
            users,
            notifier,
            codes,
            config,
        }
    }

    /// Look up a live staged registration, mapping absence and expiry to errors.
    fn live_registration(&self, email: &str) -> AppResult<StagedRegistration> {
        match self.store.lookup(email) {
            PendingLookup::Live(staged) => Ok(staged),
            PendingLookup::Missing => {
                warn!(email = %email, "No pending registration found");
                Err(AppError::not_found(NO_PENDING_REGISTRATION))
            }
            PendingLookup::Expired { expired_at } => {
                warn!(email = %email, expired_at = %expired_at, "Pending registration expired");
                Err(AppError::Expired)
            }
        }
    }

    async fn send_code(&self, email: &str, staged_code: &domain::VerificationCode) -> AppResult<()> {
        guarded("notifier", || {
            self.notifier.send_verification_code(email, staged_code)
        })
        .await?
        .map_err(|e| match e {
            AppError::Delivery(_) => e,
            other => AppError::delivery(other.to_string()),
        })
    }
}

#[async_trait]
impl RegistrationService for Registrar {
    async fn signup(&self, input: NewRegistration) -> AppResult<SignupOutcome> {
        let started = Instant::now();

        let first_name = require(&input.first_name, "First name")?;
        let last_name = require(&input.last_name, "Last name")?;
        let email = normalize_email(require(&input.email, "Email")?);
        require(&input.password, "Password")?;
        let role: UserRole = require(&input.role, "Role")?.parse()?;

        let phone_number = optional(input.phone_number);
        info!(
            email = %email,
            role = %role,
            phone = %phone_number.as_deref().map(mask_phone).unwrap_or_default(),
            "Processing signup"
        );

        let existing = guarded("user directory", || self.users.find_by_email(&email))
            .await?
            .map_err(into_persistence)?;
        if existing.is_some() {
            warn!(email = %email, "Signup rejected, user already exists");
            return Err(AppError::conflict("User with this email already exists"));
        }

        let password_hash = Password::new(&input.password)?.into_string();

        let attributes = match role {
            UserRole::Farmer => RoleAttributes::Farmer(input.farmer),
            UserRole::Herder => RoleAttributes::Herder(input.herder),
            UserRole::Admin => RoleAttributes::Admin,
        };

        let profile = RegistrationProfile {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.clone(),
            phone_number,
            password_hash,
            role,
            attributes,
            location: optional(input.location),
            bio: optional(input.bio),
            verified: false,
        };

        let code = self.codes.generate();
        let staged = StagedRegistration::new(
            profile,
            code.clone(),
            self.store.now(),
            self.config.expiry_window(),
        );
        let expires_at = staged.expires_at;

        if self.config.reject_duplicate_pending {
            if !self.store.put_if_vacant(staged) {
                warn!(email = %email, "Signup rejected, registration already pending");
                return Err(AppError::conflict("registration already pending"));
            }
        } else if self.store.put(staged) {
            info!(email = %email, "Replaced existing pending registration");
        }

        debug!(email = %email, expires_at = %expires_at, "Stored pending registration");

        self.send_code(&email, &code).await?;

        info!(
            email = %email,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Signup completed, verification code sent"
        );

        Ok(SignupOutcome { email })
    }

    async fn verify_code(&self, email: &str, code: &str) -> AppResult<User> {
        let email = normalize_email(require(email, "Email")?);
        require(code, "Verification code")?;

        info!(email = %email, "Verifying code");

        let staged = self.live_registration(&email)?;

        if !staged.verification_code.matches(code) {
            warn!(email = %email, "Invalid verification code");
            return Err(AppError::Mismatch);
        }

        let mut profile = staged.profile;
        profile.verified = true;

        let user = match guarded("user directory", || self.users.create(profile)).await? {
            Ok(user) => user,
            Err(AppError::Conflict(msg)) => {
                warn!(email = %email, "User created concurrently, keeping pending registration");
                return Err(AppError::Conflict(msg));
            }
            Err(e) => return Err(into_persistence(e)),
        };

        if !self.store.remove_generation(&email, staged.id) {
            debug!(email = %email, "Pending registration already replaced or removed");
        }

        info!(
            email = %email,
            user_id = %user.id,
            role = user.role.display_name(),
            "User registered"
        );
        Ok(user)
    }

    async fn resend_code(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(require(email, "Email")?);

        info!(email = %email, "Resending verification code");

        self.live_registration(&email)?;

        let code = self.codes.generate();
        if !self.store.replace_code(&email, code.clone()) {
            warn!(email = %email, "Pending registration removed before code replacement");
            return Err(AppError::not_found(NO_PENDING_REGISTRATION));
        }

        self.send_code(&email, &code).await?;

        info!(email = %email, "Verification code resent");
        Ok(())
    }

    async fn cancel_registration(&self, email: &str) -> AppResult<Removal> {
        let email = normalize_email(require(email, "Email")?);

        let removal = self.store.remove(&email);
        info!(
            email = %email,
            registration_removed = removal.registration_removed,
            code_removed = removal.code_removed,
            "Registration cancelled"
        );

        Ok(removal)
    }

    fn trigger_sweep(&self) -> SweepReport {
        info!("Manual cleanup triggered");
        run_sweep(&self.store, self.config.verbose_logging)
    }

    fn pending_count(&self) -> usize {
        self.store.size()
    }
}

/// Trimmed value of a required field, or `"<field> is required"`.
fn require<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn into_persistence(err: AppError) -> AppError {
    match err {
        AppError::Persistence(_) => err,
        other => AppError::persistence(other.to_string()),
    }
}

/// Run a collaborator call. The outer error is reserved for a panic inside
/// the collaborator; whatever the collaborator returned is passed back as-is.
async fn guarded<T, F, Fut>(collaborator: &'static str, call: F) -> AppResult<AppResult<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let outcome = match std::panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(pending) => AssertUnwindSafe(pending).catch_unwind().await,
        Err(panic) => Err(panic),
    };

    match outcome {
        Ok(result) => Ok(result),
        Err(_) => {
            error!(collaborator, "Collaborator panicked");
            Err(AppError::internal(format!("{collaborator} panicked")))
        }
    }
}
