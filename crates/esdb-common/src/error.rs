//! Error types for the esdb client

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Shared, cloneable inner cause.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Flat error taxonomy for the esdb client.
///
/// Variants only carry a message and, where useful, the inner cause. Layers
/// above the transport decide which of them are worth retrying.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Generic connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A connection to the server could not be established
    #[error("Cannot establish connection: {message}")]
    CannotEstablishConnection {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    /// Cluster discovery failed
    #[error("Cluster error: {message}")]
    Cluster {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    /// The operation requires authentication but the client is not authenticated
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// A caller-supplied argument was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation did not complete in time
    #[error("Operation timed out: {0}")]
    OperationTimedOut(String),

    /// The connection string could not be tokenized
    #[error("Connection string error: {0}")]
    ConnectionString(String),
}

impl ClientError {
    /// `CannotEstablishConnection` without an inner cause
    pub fn cannot_establish(message: impl Into<String>) -> Self {
        ClientError::CannotEstablishConnection {
            message: message.into(),
            cause: None,
        }
    }

    /// `CannotEstablishConnection` wrapping an inner cause
    pub fn cannot_establish_with<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ClientError::CannotEstablishConnection {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// `Cluster` without an inner cause
    pub fn cluster(message: impl Into<String>) -> Self {
        ClientError::Cluster {
            message: message.into(),
            cause: None,
        }
    }

    /// `Cluster` wrapping an inner cause
    pub fn cluster_with<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ClientError::Cluster {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// `NotAuthenticated` with the default message
    pub fn not_authenticated() -> Self {
        ClientError::NotAuthenticated("Authentication error".to_string())
    }

    /// Returns true if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::CannotEstablishConnection { .. } | ClientError::OperationTimedOut(_)
        )
    }
}
