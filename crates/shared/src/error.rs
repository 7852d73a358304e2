use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codes the auction API puts in its error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown lot id.
    NotFound,
    /// Rejected order payload.
    Validation,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::Validation => "validation",
            ErrorCode::Internal => "internal",
        })
    }
}

/// Error body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Attaches the HTTP status the body arrived with.
    pub fn with_status(self, status: u16) -> ApiException {
        ApiException {
            status,
            code: self.code,
            message: self.message,
        }
    }
}

#[derive(Debug, Error)]
#[error("HTTP {status} {code}: {message}")]
pub struct ApiException {
    pub status: u16,
    pub code: ErrorCode,
    pub message: String,
}
