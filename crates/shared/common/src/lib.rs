//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Unified error handling for the registration workflow and HTTP
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{panic_response, AppError, AppResult};
