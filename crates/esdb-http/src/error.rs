//! HTTP error types and handling

use esdb_common::ClientError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed inner cause of a transport failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the HTTP transport.
///
/// `InvalidArgument` is only ever returned synchronously from a dispatch
/// call. Every other variant is delivered through the failure callback.
#[derive(Error, Debug)]
pub enum HttpError {
    /// A required parameter was missing or malformed
    #[error("Invalid argument '{param}': {reason}")]
    InvalidArgument {
        param: &'static str,
        reason: String,
    },

    /// Connection could not be established (DNS, TCP, TLS)
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Send or receive failed after the connection was up
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Request did not complete within the configured duration
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// The client could not be constructed
    #[error("Client configuration error: {0}")]
    Config(String),
}

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorCategory {
    /// Caller passed a bad argument
    Argument,
    /// Connection-related errors (DNS, TCP, TLS)
    Connection,
    /// I/O or protocol failure on an established exchange
    Transport,
    /// Timeout errors
    Timeout,
    /// Client construction errors
    Configuration,
}

impl HttpError {
    pub fn invalid_argument(param: &'static str, reason: impl Into<String>) -> Self {
        HttpError::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }

    pub fn connection<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HttpError::Connection {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        HttpError::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HttpError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Categorize the error for reporting
    pub fn category(&self) -> HttpErrorCategory {
        match self {
            HttpError::InvalidArgument { .. } => HttpErrorCategory::Argument,
            HttpError::Connection { .. } => HttpErrorCategory::Connection,
            HttpError::Transport { .. } => HttpErrorCategory::Transport,
            HttpError::Timeout(_) => HttpErrorCategory::Timeout,
            HttpError::Config(_) => HttpErrorCategory::Configuration,
        }
    }

    /// True for failures of the network exchange itself (connect, send, receive)
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Connection { .. } | HttpError::Transport { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout(_))
    }

    /// Name of the offending parameter for argument errors
    pub fn invalid_param(&self) -> Option<&'static str> {
        match self {
            HttpError::InvalidArgument { param, .. } => Some(param),
            _ => None,
        }
    }

    /// Sanitize error message (remove credentials, auth header values, internal IPs)
    pub fn sanitized_message(&self) -> String {
        let msg = self.to_string();
        sanitize_error_message(&msg)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            HttpError::connection(err)
        } else {
            let message = err.to_string();
            HttpError::transport_with(message, err)
        }
    }
}

impl From<HttpError> for ClientError {
    fn from(err: HttpError) -> Self {
        let message = err.sanitized_message();
        match err {
            HttpError::InvalidArgument { .. } => ClientError::InvalidArgument(message),
            HttpError::Timeout(_) => ClientError::OperationTimedOut(message),
            HttpError::Config(_) => ClientError::Connection(message),
            HttpError::Connection { .. } | HttpError::Transport { .. } => {
                ClientError::CannotEstablishConnection {
                    message,
                    cause: Some(Arc::new(err)),
                }
            }
        }
    }
}

/// Sanitize error messages by removing sensitive information
pub(crate) fn sanitize_error_message(msg: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static INTERNAL_IP_RE: OnceLock<Regex> = OnceLock::new();
    static AUTH_HEADER_RE: OnceLock<Regex> = OnceLock::new();

    let url_creds_re = URL_CREDS_RE
        .get_or_init(|| Regex::new(r"(https?://)[^@:/\s]+:[^@/\s]+@").expect("valid regex"));
    let internal_ip_re = INTERNAL_IP_RE.get_or_init(|| {
        Regex::new(r"\b(10\.|172\.(1[6-9]|2[0-9]|3[01])\.|192\.168\.)\d+\.\d+\b")
            .expect("valid regex")
    });
    let auth_header_re = AUTH_HEADER_RE.get_or_init(|| {
        Regex::new(
            r"(?i)(authorization:\s*(?:basic|bearer)|basic|bearer|api[_-]?key|token|password)\s*[:=]?\s*\S+",
        )
        .expect("valid regex")
    });

    let sanitized = url_creds_re.replace_all(msg, "${1}[REDACTED]@");
    let sanitized = internal_ip_re.replace_all(&sanitized, "[INTERNAL_IP]");
    let sanitized = auth_header_re.replace_all(&sanitized, "$1: [REDACTED]");

    sanitized.to_string()
}
