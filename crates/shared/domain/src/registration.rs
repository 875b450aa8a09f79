//! Pending registration types.
//!
//! A registration is staged under its normalized email until the user
//! confirms the emailed verification code.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{VERIFICATION_CODE_LENGTH, VERIFICATION_CODE_MAX, VERIFICATION_CODE_MIN};
use crate::error::{DomainError, DomainResult};
use crate::user::{RoleAttributes, UserRole};

/// Canonical form of an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Mask every digit of a phone number except the last four.
pub fn mask_phone(phone: &str) -> String {
    let total = phone.chars().filter(char::is_ascii_digit).count();
    let mut seen = 0;
    phone
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen + 4 <= total {
                    return '*';
                }
            }
            c
        })
        .collect()
}

/// A six digit numeric verification code.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Build a code from an integer in the issued range.
    pub fn from_number(value: u32) -> DomainResult<Self> {
        if !(VERIFICATION_CODE_MIN..=VERIFICATION_CODE_MAX).contains(&value) {
            return Err(DomainError::validation("verification code out of range"));
        }
        Ok(Self(value.to_string()))
    }

    /// Parse a code string, requiring exactly six ASCII digits.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if raw.len() != VERIFICATION_CODE_LENGTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("verification code must be 6 digits"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact string comparison against a submitted code.
    pub fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted
    }
}

// Codes gate account creation; keep them out of logs.
impl std::fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VerificationCode([REDACTED])")
    }
}

/// Everything needed to persist a user once the email is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub attributes: RoleAttributes,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
}

/// An unconfirmed signup held until verification, cancellation or expiry.
#[derive(Debug, Clone)]
pub struct StagedRegistration {
    /// Generation id; a fresh signup for the same email gets a new one.
    pub id: Uuid,
    pub email: String,
    pub profile: RegistrationProfile,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verification_code: VerificationCode,
}

impl StagedRegistration {
    pub fn new(
        profile: RegistrationProfile,
        code: VerificationCode,
        now: DateTime<Utc>,
        expiry: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: profile.email.clone(),
            profile,
            created_at: now,
            expires_at: now + expiry,
            verification_code: code,
        }
    }

    /// Expired once `now` is strictly after `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
