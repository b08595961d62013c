//! Error types
//!
//! Every fallible operation in the library returns [`Error`]. Callers that only
//! care about the broad category can match on [`Error::kind`].

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown endpoint or operation name
    Lookup,
    /// The server answered with a non-2xx status
    RemoteStatus,
    /// The body could not be decoded, or had the wrong shape
    Decode,
    /// Invalid caller-supplied configuration or input
    Configuration,
    /// Network, I/O or URL failures below the HTTP layer
    Transport,
}

/// Errors produced by sessions, APIs and resources
#[derive(Debug, Error)]
pub enum Error {
    /// No endpoint with this name in the bound spec.
    #[error("No endpoint '{0}'")]
    NoSuchEndpoint(String),

    /// No operation with this name on the endpoint.
    #[error("No operation '{0}'")]
    NoSuchOperation(String),

    /// The server returned a non-success status.
    #[error("{method} {url} failed: {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        /// Sanitized and truncated response body
        body: String,
    },

    /// A structured body failed to parse.
    #[error("Failed to decode {format} body from {url}: {message}")]
    Decode {
        format: &'static str,
        url: String,
        message: String,
    },

    /// The decoded body does not have the shape the caller asked for.
    #[error("Unexpected response shape: expected {expected}, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: String,
    },

    /// Invalid configuration value (policy names, field types, ...).
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A path template placeholder had no value.
    #[error("Missing path parameter '{0}'")]
    MissingPathParam(String),

    /// The resource has no `id` field.
    #[error("Resource has no id")]
    MissingId,

    /// The resource was built without an API handle.
    #[error("Resource is not bound to an API")]
    Unbound,

    /// The session was closed before the request was issued.
    #[error("Session is closed")]
    SessionClosed,

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A spawned fan-out task panicked or was aborted.
    #[error("Task failed: {0}")]
    Task(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSuchEndpoint(_) | Self::NoSuchOperation(_) => ErrorKind::Lookup,
            Self::Status { .. } => ErrorKind::RemoteStatus,
            Self::Decode { .. } | Self::UnexpectedShape { .. } => ErrorKind::Decode,
            Self::Configuration(_)
            | Self::MissingPathParam(_)
            | Self::MissingId
            | Self::Unbound => ErrorKind::Configuration,
            Self::SessionClosed | Self::Http(_) | Self::Url(_) | Self::Io(_) | Self::Task(_) => {
                ErrorKind::Transport
            },
        }
    }

    /// HTTP status for [`Error::Status`], `None` otherwise
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn decode(format: &'static str, url: &url::Url, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            format,
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
