//! Response Envelope
//!
//! Every boundary call answers with `{ success, message?, result? }`.
//! On failure `message` carries the cause and `result` is absent.
//! Failed envelopes are rendered by `AppError`, which owns the status code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            message: None,
            result: Some(result),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            result: None,
        }
    }
}
