//! Error types for the concierge session controller.
//!
//! Every failure the controller can observe is represented here.  None of them
//! is fatal: the session recovers from each one locally and surfaces it either
//! as a timeline entry (request/response path) or as a connection status
//! update (stream path).

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for concierge.
#[derive(Clone, Debug)]
pub enum Error {
    /// The request never produced a response: DNS, refused connection, reset.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The request did not complete within the configured timeout.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The server answered with a non-2xx status.
    Server {
        /// HTTP status code.
        status_code: u16,
        /// The `detail` string supplied by the server, if any.
        detail: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// A payload could not be decoded.
    MalformedPayload {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The interactive connection closed with a non-normal code or failed.
    ConnectionClosed {
        /// Human-readable error message.
        message: String,
        /// Close code, when the peer supplied one.
        code: Option<u16>,
    },

    /// A frame was sent on a connection that is not open.
    NotConnected {
        /// Human-readable error message.
        message: String,
    },

    /// A caller-supplied value was rejected.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new server error.
    pub fn server(status_code: u16, detail: Option<String>, message: impl Into<String>) -> Self {
        Error::Server {
            status_code,
            detail,
            message: message.into(),
        }
    }

    /// Creates a new malformed payload error.
    pub fn malformed_payload(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::MalformedPayload {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new connection-closed error.
    pub fn connection_closed(message: impl Into<String>, code: Option<u16>) -> Self {
        Error::ConnectionClosed {
            message: message.into(),
            code,
        }
    }

    /// Creates a new not-connected error.
    pub fn not_connected(message: impl Into<String>) -> Self {
        Error::NotConnected {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error is a transport failure (including timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Timeout { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a non-2xx server answer.
    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// Returns true if this error is a malformed payload.
    pub fn is_malformed_payload(&self) -> bool {
        matches!(self, Error::MalformedPayload { .. })
    }

    /// Returns true if this error is an abnormal connection close.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Error::ConnectionClosed { .. })
    }

    /// Returns true if this error is a send on a connection that is not open.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::NotConnected { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the text shown to the user for this error.
    ///
    /// Server errors prefer the server-supplied `detail` verbatim.
    pub fn user_detail(&self) -> String {
        match self {
            Error::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Error::Transport { message, .. }
            | Error::Timeout { message, .. }
            | Error::Server { message, .. }
            | Error::MalformedPayload { message, .. }
            | Error::ConnectionClosed { message, .. }
            | Error::NotConnected { message }
            | Error::Validation { message, .. }
            | Error::Io { message, .. }
            | Error::Url { message, .. } => message.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Server {
                status_code,
                detail,
                message,
            } => {
                if let Some(detail) = detail {
                    write!(f, "Server error ({status_code}): {detail}")
                } else {
                    write!(f, "Server error ({status_code}): {message}")
                }
            }
            Error::MalformedPayload { message, .. } => {
                write!(f, "Malformed payload: {message}")
            }
            Error::ConnectionClosed { message, code } => {
                if let Some(code) = code {
                    write!(f, "Connection closed: {message} (code: {code})")
                } else {
                    write!(f, "Connection closed: {message}")
                }
            }
            Error::NotConnected { message } => {
                write!(f, "Not connected: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::MalformedPayload { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::malformed_payload(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::malformed_payload(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for concierge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_prefers_detail() {
        let err = Error::server(
            422,
            Some("query must not be empty".to_string()),
            "Unprocessable Entity",
        );
        assert!(err.is_server());
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(err.user_detail(), "query must not be empty");
        assert_eq!(
            err.to_string(),
            "Server error (422): query must not be empty"
        );
    }

    #[test]
    fn server_error_without_detail_uses_message() {
        let err = Error::server(502, None, "Bad Gateway");
        assert_eq!(err.user_detail(), "Bad Gateway");
        assert_eq!(err.to_string(), "Server error (502): Bad Gateway");
    }

    #[test]
    fn timeout_counts_as_transport() {
        let err = Error::timeout("request timed out", Some(30.0));
        assert!(err.is_transport());
        assert!(err.is_timeout());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn json_errors_are_malformed_payloads() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.is_malformed_payload());
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn connection_closed_display_includes_code() {
        let err = Error::connection_closed("abnormal closure", Some(1006));
        assert!(err.is_connection_closed());
        assert_eq!(
            err.to_string(),
            "Connection closed: abnormal closure (code: 1006)"
        );
    }
}
