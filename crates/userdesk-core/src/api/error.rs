use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Message used when a failed response carries no readable error payload.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Every failure the transport can produce. The display text is always a
/// human-readable message suitable for showing next to a form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error body returned by the API: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success status and its raw body.
    ///
    /// Falls back to [`GENERIC_FAILURE_MESSAGE`] when the body is not JSON
    /// or has no usable `error` field.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .ok()
            .and_then(|payload| payload.error)
            .map(|msg| msg.trim().to_string())
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());

        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the bearer credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
