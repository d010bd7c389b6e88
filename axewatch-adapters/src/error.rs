//! Error types for fetchers.

use thiserror::Error;

/// Errors that can occur when fetching telemetry from a device.
///
/// None of these are fatal: the coordinator records them and retries on
/// its next scheduled cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The host could not be reached.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The device answered with a non-success status.
    #[error("Device returned HTTP status {status}")]
    Http { status: u16 },

    /// The body was not a JSON object.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Any other transport failure.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The HTTP client could not be built.
    #[error("Invalid client configuration: {0}")]
    Client(String),
}

impl FetchError {
    /// Short machine-friendly name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connect(_) => "connect",
            FetchError::Timeout => "timeout",
            FetchError::Http { .. } => "http",
            FetchError::Decode(_) => "decode",
            FetchError::Request(_) => "request",
            FetchError::Client(_) => "client",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Request(err.to_string())
        }
    }
}
