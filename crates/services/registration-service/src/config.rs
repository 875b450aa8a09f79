//! Registration service configuration.

use std::env;

use tracing::warn;

use common::{DatabaseConfig, RegistrationConfig, ServiceConfig};

/// Registration service configuration.
#[derive(Clone, Default)]
pub struct RegistrationServiceConfig {
    /// Bind address and service name
    pub service: ServiceConfig,
    /// Database settings; `None` keeps confirmed users in memory
    pub database: Option<DatabaseConfig>,
    /// Pending registration workflow settings
    pub registration: RegistrationConfig,
    /// Sender address for verification emails
    pub mail_from: String,
}

impl std::fmt::Debug for RegistrationServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationServiceConfig")
            .field("service", &self.service)
            .field("database", &self.database.as_ref().map(|_| "[REDACTED]"))
            .field("registration", &self.registration)
            .field("mail_from", &self.mail_from)
            .finish()
    }
}

impl RegistrationServiceConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = RegistrationConfig::default();
        let service_defaults = ServiceConfig::default();

        let registration = RegistrationConfig {
            pending_expiry_minutes: expiry_minutes(
                parse_var("PENDING_EXPIRY_MINUTES"),
                defaults.pending_expiry_minutes,
            ),
            sweep_interval_ms: parse_var("SWEEP_INTERVAL_MS").unwrap_or(defaults.sweep_interval_ms),
            verbose_logging: flag_var("VERBOSE_LOGGING").unwrap_or(defaults.verbose_logging),
            reject_duplicate_pending: flag_var("REJECT_DUPLICATE_PENDING")
                .unwrap_or(defaults.reject_duplicate_pending),
        };

        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            ..DatabaseConfig::default()
        });

        Self {
            service: ServiceConfig {
                host: env::var("REGISTRATION_SERVICE_HOST").unwrap_or(service_defaults.host),
                port: parse_var("REGISTRATION_SERVICE_PORT").unwrap_or(service_defaults.port),
                ..service_defaults
            },
            database,
            registration,
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@greenpath.local".to_string()),
        }
    }
}

/// Configured expiry, or `default` when it is unset or out of range.
fn expiry_minutes(configured: Option<i64>, default: i64) -> i64 {
    match configured {
        None => default,
        Some(minutes) => RegistrationConfig::checked_expiry_minutes(minutes).unwrap_or_else(|| {
            warn!(
                configured = minutes,
                default, "PENDING_EXPIRY_MINUTES out of range, using default"
            );
            default
        }),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn flag_var(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}
