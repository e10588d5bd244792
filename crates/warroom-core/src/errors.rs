//! Responder error taxonomy.
//!
//! Errors are grouped by what the caller can do about them. The engine
//! never retries a specialist turn, but the classification drives log
//! severity and metrics labels, and HTTP responders share the same
//! status mapping.

use std::time::Duration;

#[derive(Clone, Debug, thiserror::Error)]
pub enum ResponderError {
    // Fatal: the same call will fail again.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // Transient: the backend may recover on its own.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("network error: {0}")]
    NetworkError(String),

    // Operational: imposed by this process, not the backend.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,
}

impl ResponderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::NetworkError(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::InvalidRequest(_) | Self::MalformedResponse(_)
        )
    }

    /// Stable label for logs and metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "auth_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MalformedResponse(_) => "malformed_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Map an HTTP status from a completions backend to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            _ => Self::ServerError { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ResponderError::RateLimited { retry_after: None }.is_retryable());
        assert!(ResponderError::NetworkError("reset".into()).is_retryable());
        assert!(ResponderError::ServerError { status: 503, body: String::new() }.is_retryable());
        assert!(!ResponderError::Timeout(Duration::from_secs(60)).is_retryable());
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        let err = ResponderError::AuthenticationFailed("bad key".into());
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn from_status_maps_the_common_codes() {
        assert!(matches!(
            ResponderError::from_status(401, "no".into()),
            ResponderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ResponderError::from_status(400, "bad".into()),
            ResponderError::InvalidRequest(_)
        ));
        assert!(matches!(
            ResponderError::from_status(429, String::new()),
            ResponderError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            ResponderError::from_status(500, "boom".into()),
            ResponderError::ServerError { status: 500, .. }
        ));
    }

    #[test]
    fn error_kind_is_stable() {
        assert_eq!(ResponderError::Cancelled.error_kind(), "cancelled");
        assert_eq!(
            ResponderError::MalformedResponse("empty choices".into()).error_kind(),
            "malformed_response"
        );
    }
}
