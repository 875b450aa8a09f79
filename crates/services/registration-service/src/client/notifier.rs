//! Verification email delivery.
//!
//! Without an SMTP relay the rendered message is written to the log, which
//! is how codes reach developers in local setups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::AppResult;
use domain::VerificationCode;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Sends verification codes to users.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `code` to `email`. Any error is reported to callers as a delivery failure.
    async fn send_verification_code(&self, email: &str, code: &VerificationCode) -> AppResult<()>;
}

/// Rendered verification email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl VerificationEmail {
    pub fn render(
        from: impl Into<String>,
        to: impl Into<String>,
        code: &VerificationCode,
        expiry_minutes: i64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: "GreenPath - Verify your email".to_string(),
            body: format!(
                "Welcome to GreenPath!\n\n\
                 Your verification code is: {}\n\n\
                 This code expires in {} minutes. If you did not sign up, ignore this email.",
                code.as_str(),
                expiry_minutes
            ),
        }
    }
}

/// Notifier that logs the email instead of sending it.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
    expiry_minutes: i64,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>, expiry_minutes: i64) -> Self {
        Self {
            from: from.into(),
            expiry_minutes,
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(&self, email: &str, code: &VerificationCode) -> AppResult<()> {
        let message = VerificationEmail::render(&self.from, email, code, self.expiry_minutes);

        tracing::info!(to = %message.to, subject = %message.subject, "Processing verification email");
        tracing::warn!("SMTP not configured - logging email instead of sending");
        tracing::info!(
            "=== EMAIL (not sent) ===\n\
             From: {}\n\
             To: {}\n\
             Subject: {}\n\
             Body:\n{}\n\
             ========================",
            message.from,
            message.to,
            message.subject,
            message.body
        );
        Ok(())
    }
}
