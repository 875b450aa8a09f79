//! HTTP handlers.

mod admin_handler;
mod health_handler;
mod registration_handler;

pub use admin_handler::{admin_routes, CleanupResponse};
pub use health_handler::{health_routes, HealthResponse};
pub use registration_handler::{
    registration_routes, CancelRegistrationRequest, CancelRegistrationResponse, ResendCodeRequest,
    SignupRequest, SignupResponse, StatusResponse, VerifyCodeRequest, VerifyCodeResponse,
};
