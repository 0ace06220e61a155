//! Gateway error types.

use thiserror::Error;

/// Errors that can occur when reading from the persistence backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The API key was rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend returned an error response.
    #[error("API error (HTTP {status}) on {table}: {message}")]
    ApiError {
        table: String,
        status: u16,
        message: String,
    },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A response body did not match the expected row shape.
    #[error("failed to decode {table} rows: {message}")]
    Decode { table: String, message: String },

    /// The gateway is missing a required setting.
    #[error("gateway not configured: {0}")]
    NotConfigured(String),

    /// A fetch was made to fail on purpose (in-memory gateway).
    #[error("injected failure on {0}")]
    Injected(String),
}
