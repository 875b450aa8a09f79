//! User domain entity and related types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ROLE_ADMIN, ROLE_FARMER, ROLE_HERDER};
use crate::error::DomainError;
use crate::registration::RegistrationProfile;

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Farmer,
    Herder,
    Admin,
}

impl UserRole {
    /// Human-readable role name
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Farmer => "Farmer",
            UserRole::Herder => "Herder",
            UserRole::Admin => "Admin",
        }
    }

    /// Canonical upper-case identifier used for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Farmer => ROLE_FARMER,
            UserRole::Herder => ROLE_HERDER,
            UserRole::Admin => ROLE_ADMIN,
        }
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ROLE_FARMER) {
            Ok(UserRole::Farmer)
        } else if s.eq_ignore_ascii_case(ROLE_HERDER) {
            Ok(UserRole::Herder)
        } else if s.eq_ignore_ascii_case(ROLE_ADMIN) {
            Ok(UserRole::Admin)
        } else {
            Err(DomainError::validation("invalid role"))
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Farmer-specific profile attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmerDetails {
    pub farm_name: Option<String>,
    pub farm_size_hectares: Option<f64>,
    pub primary_crops: Option<String>,
    pub farming_experience_years: Option<i32>,
}

/// Herder-specific profile attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HerderDetails {
    pub herd_type: Option<String>,
    pub herd_size: Option<i32>,
    pub grazing_area: Option<String>,
    pub herding_experience_years: Option<i32>,
}

/// Attributes that only apply to one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RoleAttributes {
    Farmer(FarmerDetails),
    Herder(HerderDetails),
    Admin,
}

impl RoleAttributes {
    /// Empty attribute set matching the given role
    pub fn empty_for(role: UserRole) -> Self {
        match role {
            UserRole::Farmer => RoleAttributes::Farmer(FarmerDetails::default()),
            UserRole::Herder => RoleAttributes::Herder(HerderDetails::default()),
            UserRole::Admin => RoleAttributes::Admin,
        }
    }
}

/// Persisted user entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub attributes: RoleAttributes,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub enabled: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new persisted user from a confirmed registration profile.
    pub fn from_profile(id: Uuid, profile: RegistrationProfile, now: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            password_hash: profile.password_hash,
            phone_number: profile.phone_number,
            role: profile.role,
            attributes: profile.attributes,
            location: profile.location,
            bio: profile.bio,
            enabled: true,
            verified: profile.verified,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name(),
            role: user.role.to_string(),
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}
