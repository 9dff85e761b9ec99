//! Operation result envelope
//!
//! The UI-facing `{ success, data?, error? }` shape. Expected failures
//! (lookup misses) become `success = false` payloads the frontend can
//! render; unexpected errors stay on the `Err` channel and never enter
//! the envelope.

use serde::{Deserialize, Serialize};

/// Result envelope for a single admin operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpResult<T> {
    /// Whether the operation found/affected what it was asked about
    pub success: bool,
    /// Payload (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> OpResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
