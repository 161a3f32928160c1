//! Error taxonomy for calls against the hosting API.

use thiserror::Error;

/// Failure of a single API call.
///
/// 401 and 403/405 are split out because views react to them differently:
/// an authorization loss clears the stored token, a permission failure only
/// shows a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The bearer token is missing, expired or rejected (HTTP 401).
    #[error("authorization required")]
    Unauthorized,
    /// The token is valid but lacks the rights for this call (HTTP 403/405).
    #[error("insufficient permissions")]
    Forbidden,
    /// Any other non-success status, with the server's message if it sent one.
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },
    /// A success status other than the one the endpoint promises (e.g. 200
    /// where 201 Created is required).
    #[error("unexpected response status {0}")]
    UnexpectedStatus(u16),
    /// Connection, DNS, TLS or timeout failure.
    #[error("API unavailable: {0}")]
    Network(String),
    /// The body could not be read or did not match the expected shape.
    #[error("malformed API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success response.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 | 405 => Self::Forbidden,
            _ => Self::Status {
                status,
                message: server_message(body).unwrap_or_else(|| "server error".to_string()),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Extract the `message` field from a JSON error body, if present.
pub fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
