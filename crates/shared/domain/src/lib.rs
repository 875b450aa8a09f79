//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! roles and role-specific profile data, staged registrations and their
//! verification codes, and the password value object.

pub mod constants;
pub mod error;
pub mod password;
pub mod registration;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use registration::{
    mask_phone, normalize_email, RegistrationProfile, StagedRegistration, VerificationCode,
};
pub use user::{FarmerDetails, HerderDetails, RoleAttributes, User, UserResponse, UserRole};
