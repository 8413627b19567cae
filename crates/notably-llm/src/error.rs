//! Error types for the generation client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for generation-service operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend/API error from the provider.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network/connectivity error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (API key missing, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Provider message.
        message: String,
        /// How long the provider asked us to wait, if it said.
        retry_after: Option<Duration>,
    },

    /// Authentication failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The stream ended with an error event or broke off mid-message.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The service answered, but with no text.
    #[error("Empty response from generation service")]
    EmptyResponse,
}

impl LlmError {
    /// Create a rate limit error from a message and an optional `Retry-After` header value.
    pub fn rate_limit(message: impl Into<String>, retry_after_header: Option<&str>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after: retry_after_header.and_then(parse_retry_after_header),
        }
    }

    /// Get the retry-after duration if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns true if the same request could succeed if the user tries again.
    ///
    /// Nothing in this crate retries on its own; callers use this to decide
    /// whether to offer a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Stream(_) | Self::EmptyResponse
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

/// Parse a Retry-After header value (integer seconds).
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(LlmError::Network("timeout".to_string()).is_transient());
        assert!(LlmError::rate_limit("slow down", None).is_transient());
        assert!(LlmError::EmptyResponse.is_transient());
        assert!(!LlmError::Config("bad config".to_string()).is_transient());
        assert!(!LlmError::Auth("unauthorized".to_string()).is_transient());
    }

    #[test]
    fn test_parse_retry_after_header() {
        assert_eq!(parse_retry_after_header("5"), Some(Duration::from_secs(5)));
        assert_eq!(
            parse_retry_after_header(" 10 "),
            Some(Duration::from_secs(10))
        );
        assert_eq!(parse_retry_after_header("invalid"), None);
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let err = LlmError::rate_limit("limited", Some("7"));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(err.to_string().contains("limited"));

        let err = LlmError::Network("timeout".to_string());
        assert_eq!(err.retry_after(), None);
    }
}
