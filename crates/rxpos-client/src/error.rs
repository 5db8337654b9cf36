//! # Client Error Types
//!
//! Errors for calls to the pharmacy backend.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidUrl     │  │  Http           │  │  Backend {status, msg}  │ │
//! │  │                 │  │  Timeout        │  │  Unauthorized           │ │
//! │  │                 │  │                 │  │  NotFound               │ │
//! │  │                 │  │                 │  │  InvalidResponse        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backend Messages
//! The backend reports rejections in several shapes. [`extract_error_message`]
//! digs the human-readable text out of whichever one arrived:
//!
//! ```text
//! ["Batch expired", {"msg": "Stock changed"}]      → "Batch expired; Stock changed"
//! {"errors": [{"message": "Invalid customer"}]}   → "Invalid customer"
//! {"message": "Shop is closed"}                   → "Shop is closed"
//! {"error": "Forbidden"}                          → "Forbidden"
//! "Service unavailable"                           → "Service unavailable"
//! anything else                                   → fallback
//! ```

use serde_json::Value;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Base URL missing, unparsable, or not http(s).
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Non-success status with the backend's message.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// Missing or rejected bearer token.
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Success status but a body we cannot read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(err)
        }
    }
}

// =============================================================================
// Backend message extraction
// =============================================================================

/// Message to show for a rejected request.
///
/// Returns `fallback` when the payload holds nothing readable.
pub fn extract_error_message(payload: &Value, fallback: &str) -> String {
    find_message(payload).unwrap_or_else(|| fallback.to_string())
}

/// Same as [`extract_error_message`] for a raw response body that may not be
/// JSON at all.
pub fn extract_error_message_from_body(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(payload) => extract_error_message(&payload, fallback),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() || text.starts_with('<') {
                fallback.to_string()
            } else {
                text.to_string()
            }
        }
    }
}

fn find_message(payload: &Value) -> Option<String> {
    match payload {
        Value::Array(items) => join_messages(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("errors") {
                if let Some(message) = join_messages(items) {
                    return Some(message);
                }
            }
            ["message", "error"]
                .iter()
                .find_map(|key| map.get(*key).and_then(text_of))
        }
        Value::String(_) => text_of(payload),
        _ => None,
    }
}

fn join_messages(items: &[Value]) -> Option<String> {
    let messages: Vec<String> = items.iter().filter_map(item_message).collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

fn item_message(item: &Value) -> Option<String> {
    match item {
        Value::String(_) => text_of(item),
        Value::Object(map) => ["msg", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(text_of)),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================
