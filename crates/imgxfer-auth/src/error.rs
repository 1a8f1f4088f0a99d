//! Error types for ticket parsing and authorization checks.

use std::time::Duration;
use thiserror::Error;

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authorization errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Ticket record failed to parse or validate
    #[error("malformed ticket: {0}")]
    MalformedTicket(String),

    /// Ticket url could not be parsed
    #[error("invalid url {url:?}: {reason}")]
    InvalidLocator {
        /// Url as given in the ticket
        url: String,
        /// Parser error message
        reason: String,
    },

    /// Ticket url uses a scheme we cannot serve
    #[error("unsupported scheme: {0:?}")]
    UnsupportedLocator(String),

    /// Ticket exists but does not allow the requested operation
    #[error("forbidden: {0}")]
    Forbidden(#[from] Denial),

    /// No ticket registered under this identity
    #[error("no authorization for {0}")]
    NotFound(String),
}

/// Reason an authorization check was denied
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Ticket mode does not include the requested operation
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(char),

    /// Requested size is larger than the ticket allows
    #[error("size out of range: requested {requested}, allowed {allowed}")]
    SizeOutOfRange {
        /// Requested transfer size
        requested: u64,
        /// Maximum size granted by the ticket
        allowed: u64,
    },

    /// Ticket validity window has passed
    #[error("ticket expired {:.3}s ago", .0.as_secs_f64())]
    Expired(Duration),
}

impl AuthError {
    /// Check if this error is an access denial (as opposed to a missing
    /// or invalid ticket)
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Check if this error means the identity is unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::NotFound("3facfbc1".to_string());
        assert_eq!(err.to_string(), "no authorization for 3facfbc1");

        let err = AuthError::from(Denial::SizeOutOfRange {
            requested: 2048,
            allowed: 1024,
        });
        assert_eq!(
            err.to_string(),
            "forbidden: size out of range: requested 2048, allowed 1024"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(AuthError::Forbidden(Denial::OperationNotAllowed('w')).is_forbidden());
        assert!(!AuthError::NotFound("x".into()).is_forbidden());
        assert!(AuthError::NotFound("x".into()).is_not_found());
        assert!(!AuthError::MalformedTicket("bad".into()).is_not_found());
    }
}
