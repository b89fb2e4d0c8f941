//! Error types for the relay and the tree client
//!
//! `RelayError` is what the proxy returns to its caller; every variant maps
//! onto an HTTP status and a message that is safe to show a browser.
//! `FetchError` is what the tree client sees when a proxy call fails.

use thiserror::Error;

/// Failure while relaying a request to the upstream catalog
#[derive(Error, Debug)]
pub enum RelayError {
    /// Relay could not be built from the configuration
    #[error("Relay setup failed: {0}")]
    Setup(String),

    /// Request body was not `{"url": "..."}`
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Target is not an absolute http(s) URL
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    /// Target is outside the configured allowlist
    #[error("Target URL is not allowed: {0}")]
    Forbidden(String),

    /// No credential configured for the upstream
    #[error("Upstream credential is not configured")]
    MissingCredential,

    /// Outbound request could not be completed
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// Outbound request exceeded the configured timeout
    #[error("Upstream request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Upstream answered with a redirect, which is not followed
    #[error("Upstream redirected the request (status {status})")]
    Redirected { status: u16 },

    /// Upstream answered with something that is not JSON
    #[error("Upstream returned a non-JSON body (status {status})")]
    InvalidBody { status: u16 },
}

impl RelayError {
    /// HTTP status reported to the caller for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Setup(_) => 500,
            RelayError::InvalidRequest(_) | RelayError::InvalidTarget(_) => 400,
            RelayError::Forbidden(_) => 403,
            RelayError::MissingCredential
            | RelayError::Transport(_)
            | RelayError::Redirected { .. }
            | RelayError::InvalidBody { .. } => 502,
            RelayError::Timeout { .. } => 504,
        }
    }
}

/// Failure of a single tree-client call through the proxy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Proxy could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// Proxy answered with a non-2xx status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response was not a list of catalog records
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::Setup("x".into()).status_code(), 500);
        assert_eq!(RelayError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(RelayError::InvalidTarget("x".into()).status_code(), 400);
        assert_eq!(RelayError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(RelayError::MissingCredential.status_code(), 502);
        assert_eq!(RelayError::Transport("x".into()).status_code(), 502);
        assert_eq!(RelayError::InvalidBody { status: 500 }.status_code(), 502);
        assert_eq!(RelayError::Redirected { status: 302 }.status_code(), 502);
        assert_eq!(RelayError::Timeout { secs: 5 }.status_code(), 504);
    }

    #[test]
    fn test_messages_are_non_empty() {
        let errors = [
            RelayError::MissingCredential,
            RelayError::Timeout { secs: 30 },
            RelayError::InvalidBody { status: 404 },
        ];
        for e in errors {
            assert!(!e.to_string().is_empty());
        }
    }

    #[test]
    fn test_fetch_error_display() {
        let e = FetchError::Status {
            status: 502,
            message: "Upstream request failed".to_string(),
        };
        assert_eq!(e.to_string(), "API error 502: Upstream request failed");
    }
}
