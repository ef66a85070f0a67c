//! REST error types.

/// Errors raised by REST operations.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// Failed to deserialize a response body.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The API returned an error response.
    #[error("API error [{status}]: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the response body.
        message: String,
    },

    /// Rate limited (429).
    #[error("rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    RateLimited {
        /// Retry-After header value in seconds, if provided.
        retry_after: Option<u64>,
    },

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Unauthorized (401).
    #[error("unauthorized")]
    Unauthorized,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}
