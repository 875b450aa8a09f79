//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Farmer role identifier
pub const ROLE_FARMER: &str = "FARMER";

/// Herder role identifier
pub const ROLE_HERDER: &str = "HERDER";

/// Administrator role identifier
pub const ROLE_ADMIN: &str = "ADMIN";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length enforced at the HTTP boundary
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of first and last names
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum bio length
pub const MAX_BIO_LENGTH: usize = 500;

// =============================================================================
// Verification Codes
// =============================================================================

/// Number of digits in a verification code
pub const VERIFICATION_CODE_LENGTH: usize = 6;

/// Smallest issued verification code
pub const VERIFICATION_CODE_MIN: u32 = 100_000;

/// Largest issued verification code
pub const VERIFICATION_CODE_MAX: u32 = 999_999;

// =============================================================================
// Pending Registrations
// =============================================================================

/// Default lifetime of a staged registration in minutes
pub const DEFAULT_PENDING_EXPIRY_MINUTES: i64 = 15;

/// Longest accepted staged registration lifetime (one week)
pub const MAX_PENDING_EXPIRY_MINUTES: i64 = 7 * 24 * 60;

/// Default interval between expiry sweeps in milliseconds
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 300_000;
