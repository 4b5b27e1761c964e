//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConnectorError`: Errors from connector operations
//! - `ConnectionError`: Errors from connection lookup
//!
//! Both convert into the engine's [`ActionError`] at the handler boundary.

use std::fmt;
use switchyard_workflow::ActionError;

/// Errors from connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Connection to service failed.
    ConnectionFailed { reason: String },
    /// Authentication failed.
    AuthenticationFailed { reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Operation not supported.
    OperationNotSupported { operation: String },
    /// Invalid operation parameters.
    InvalidParameters { operation: String, reason: String },
    /// Timeout waiting for response.
    Timeout,
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::OperationNotSupported { operation } => {
                write!(f, "operation not supported: {operation}")
            }
            Self::InvalidParameters { operation, reason } => {
                write!(f, "invalid parameters for '{operation}': {reason}")
            }
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl ConnectorError {
    /// Converts into the engine-facing error for the given provider.
    #[must_use]
    pub fn into_action_error(self, provider: &str) -> ActionError {
        match self {
            Self::InvalidParameters { .. } | Self::OperationNotSupported { .. } => {
                ActionError::InvalidInput {
                    message: self.to_string(),
                }
            }
            Self::Timeout => ActionError::Timeout,
            other => ActionError::ExternalService {
                service: provider.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Errors from connection lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The stored connection can no longer be used.
    Expired { provider: String },
    /// The backing store failed.
    StorageFailed { reason: String },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired { provider } => {
                write!(f, "connection for provider {provider} has expired")
            }
            Self::StorageFailed { reason } => {
                write!(f, "connection storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ConnectionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_error_display() {
        let err = ConnectorError::ConnectionFailed {
            reason: "host unreachable".to_string(),
        };
        assert!(err.to_string().contains("connection failed"));
        assert!(err.to_string().contains("host unreachable"));
    }

    #[test]
    fn connector_error_rate_limited() {
        let err = ConnectorError::RateLimited {
            retry_after_secs: Some(60),
        };
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn invalid_parameters_become_invalid_input() {
        let err = ConnectorError::InvalidParameters {
            operation: "create_page".to_string(),
            reason: "databaseId is required".to_string(),
        };
        assert!(matches!(
            err.into_action_error("notion"),
            ActionError::InvalidInput { .. }
        ));
    }

    #[test]
    fn service_failures_name_the_provider() {
        let err = ConnectorError::AuthenticationFailed {
            reason: "token revoked".to_string(),
        };
        assert_eq!(
            err.into_action_error("slack"),
            ActionError::ExternalService {
                service: "slack".to_string(),
                message: "authentication failed: token revoked".to_string(),
            }
        );
    }

    #[test]
    fn connection_error_display() {
        let err = ConnectionError::Expired {
            provider: "google".to_string(),
        };
        assert_eq!(err.to_string(), "connection for provider google has expired");
    }
}
