//! # Counter Error Type
//!
//! Unified error type for counter commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Counter                            │
//! │                                                                         │
//! │  Command                                                                │
//! │  Result<T, AppError>                                                    │
//! │       │                                                                 │
//! │       ├── CartError ──────────── cart rejected input ──┐                │
//! │       ├── CheckoutError ──────── payment rule failed ──┤                │
//! │       ├── ValidationError ────── bad field ────────────┼──► AppError   │
//! │       ├── ClientError ────────── backend / network ────┤    {code,     │
//! │       └── ConfigError ────────── startup only ─────────┘     message}  │
//! │                                                                         │
//! │  The command loop prints `message` and carries on. The session, cart   │
//! │  and payment form are untouched by a failed command.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use rxpos_client::ClientError;
use rxpos_core::{CartError, CheckoutError, CoreError, ValidationError};

/// Error returned from counter commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "PAYMENT_ERROR",
///   "message": "UPI reference is required"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Cart rejected the change
    CartError,

    /// Not enough stock in the batch
    InsufficientStock,

    /// Prescription medicine needs a customer
    PrescriptionRequired,

    /// Checkout rule failed
    PaymentError,

    /// A checkout submission is already running
    CheckoutInProgress,

    /// Backend rejected the request
    BackendError,

    /// Missing or rejected credentials
    Unauthorized,

    /// Resource not found
    NotFound,

    /// Network failure or timeout
    Network,

    /// Configuration could not be loaded
    ConfigError,

    /// Anything else
    Internal,
}

impl AppError {
    /// Creates a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::NotFound, message)
    }

    /// The second checkout while one is still running.
    pub fn checkout_in_progress() -> Self {
        AppError::new(ErrorCode::CheckoutInProgress, "checkout already in progress")
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AppError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        let code = match err {
            CartError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CartError::PrescriptionRequired { .. } => ErrorCode::PrescriptionRequired,
            CartError::LineNotFound { .. } => ErrorCode::CartError,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        AppError::new(ErrorCode::PaymentError, err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Cart(e) => e.into(),
            CoreError::Checkout(e) => e.into(),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Backend { message, .. } => AppError::new(ErrorCode::BackendError, message),
            ClientError::Unauthorized => {
                AppError::new(ErrorCode::Unauthorized, "Not authorized: check the API token")
            }
            ClientError::NotFound(what) => AppError::not_found(what),
            ClientError::Timeout => {
                AppError::new(ErrorCode::Network, "The server took too long to respond")
            }
            ClientError::Http(e) => {
                tracing::error!(error = %e, "HTTP transport error");
                AppError::new(ErrorCode::Network, "Could not reach the server")
            }
            ClientError::InvalidResponse(e) => {
                tracing::error!(error = %e, "Unreadable backend response");
                AppError::internal("Unexpected response from the server")
            }
            ClientError::InvalidUrl(url) => {
                AppError::new(ErrorCode::ConfigError, format!("Invalid backend URL: {}", url))
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Failure while loading `counter.toml` and the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
