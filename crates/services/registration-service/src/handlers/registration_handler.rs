//! Registration handlers.

use std::borrow::Cow;

use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use common::AppResult;
use domain::{
    FarmerDetails, HerderDetails, UserResponse, MAX_BIO_LENGTH, MAX_NAME_LENGTH,
    MIN_PASSWORD_LENGTH,
};

use crate::extractors::{ClientIp, ValidatedJson};
use crate::service::NewRegistration;
use crate::state::AppState;

/// Signup request. Missing required fields are reported by the workflow.
#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(custom(function = "first_name_length"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(custom(function = "last_name_length"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(custom(function = "email_format"))]
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "password_length"))]
    pub password: String,
    #[serde(default)]
    pub role: String,
    pub location: Option<String>,
    #[validate(custom(function = "bio_length"))]
    pub bio: Option<String>,
    // Farmer profile
    pub farm_name: Option<String>,
    pub farm_size_hectares: Option<f64>,
    pub primary_crops: Option<String>,
    pub farming_experience_years: Option<i32>,
    // Herder profile
    pub herd_type: Option<String>,
    pub herd_size: Option<i32>,
    pub grazing_area: Option<String>,
    pub herding_experience_years: Option<i32>,
}

impl From<SignupRequest> for NewRegistration {
    fn from(req: SignupRequest) -> Self {
        NewRegistration {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            password: req.password,
            role: req.role,
            location: req.location,
            bio: req.bio,
            farmer: FarmerDetails {
                farm_name: req.farm_name,
                farm_size_hectares: req.farm_size_hectares,
                primary_crops: req.primary_crops,
                farming_experience_years: req.farming_experience_years,
            },
            herder: HerderDetails {
                herd_type: req.herd_type,
                herd_size: req.herd_size,
                grazing_area: req.grazing_area,
                herding_experience_years: req.herding_experience_years,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendCodeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelRegistrationRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelRegistrationResponse {
    pub success: bool,
    pub message: String,
    pub removed: bool,
}

/// Create registration routes
pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-code", post(verify_code))
        .route("/resend-code", post(resend_code))
        .route("/cancel-registration", post(cancel_registration))
}

/// Stage a registration and email a verification code
pub async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    let outcome = state
        .registration
        .signup(req.into())
        .instrument(info_span!("signup", client_ip = %ip))
        .await?;

    Ok(Json(SignupResponse {
        success: true,
        message: "Verification code sent to your email. Please check your inbox.".to_string(),
        email: outcome.email,
    }))
}

/// Confirm the emailed code and create the account
pub async fn verify_code(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<VerifyCodeRequest>,
) -> AppResult<Json<VerifyCodeResponse>> {
    let user = state
        .registration
        .verify_code(&req.email, &req.code)
        .instrument(info_span!("verify_code", client_ip = %ip))
        .await?;

    Ok(Json(VerifyCodeResponse {
        success: true,
        message: "Email verified successfully! Your account has been created.".to_string(),
        user_id: user.id,
        user: UserResponse::from(&user),
    }))
}

/// Send a fresh code for a pending registration
pub async fn resend_code(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<ResendCodeRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .registration
        .resend_code(&req.email)
        .instrument(info_span!("resend_code", client_ip = %ip))
        .await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "New verification code sent to your email.".to_string(),
    }))
}

/// Drop a pending registration
pub async fn cancel_registration(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<CancelRegistrationRequest>,
) -> AppResult<Json<CancelRegistrationResponse>> {
    let removal = state
        .registration
        .cancel_registration(&req.email)
        .instrument(info_span!("cancel_registration", client_ip = %ip))
        .await?;

    let message = if removal.removed() {
        "Registration cancelled successfully."
    } else {
        "No pending registration to cancel."
    };

    Ok(Json(CancelRegistrationResponse {
        success: true,
        message: message.to_string(),
        removed: removal.removed(),
    }))
}

fn email_format(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || email.trim().validate_email() {
        return Ok(());
    }
    Err(ValidationError::new("email")
        .with_message(Cow::Borrowed("Please provide a valid email address")))
}

fn password_length(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() || password.chars().count() >= MIN_PASSWORD_LENGTH {
        return Ok(());
    }
    Err(ValidationError::new("length").with_message(Cow::Owned(format!(
        "Password must be at least {MIN_PASSWORD_LENGTH} characters"
    ))))
}

fn at_most(value: &str, max: usize, field: &str) -> Result<(), ValidationError> {
    if value.chars().count() <= max {
        return Ok(());
    }
    Err(ValidationError::new("length")
        .with_message(Cow::Owned(format!("{field} must not exceed {max} characters"))))
}

fn first_name_length(first_name: &str) -> Result<(), ValidationError> {
    at_most(first_name, MAX_NAME_LENGTH, "First name")
}

fn last_name_length(last_name: &str) -> Result<(), ValidationError> {
    at_most(last_name, MAX_NAME_LENGTH, "Last name")
}

fn bio_length(bio: &str) -> Result<(), ValidationError> {
    at_most(bio, MAX_BIO_LENGTH, "Bio")
}
