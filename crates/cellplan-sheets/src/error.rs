//! Classified remote failures.
//!
//! Every transport reports failures as a [`RemoteError`]. The resilient
//! access layer only looks at [`RemoteError::is_retryable`] to decide
//! between backing off and surfacing the error.

use std::fmt;
use std::time::Duration;

/// HTTP statuses that indicate a transient condition on the remote side.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Transport-level failure codes observed before any HTTP status exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCode {
    ConnectionReset,
    TimedOut,
    DnsFailure,
    /// Nothing listening on the remote port. Not retried.
    ConnectionRefused,
    /// Any other request failure (TLS, body decoding, redirects, ...).
    Other,
}

impl NetworkCode {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::ConnectionReset | Self::TimedOut | Self::DnsFailure)
    }
}

impl fmt::Display for NetworkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConnectionReset => "connection_reset",
            Self::ConnectionRefused => "connection_refused",
            Self::TimedOut => "timed_out",
            Self::DnsFailure => "dns_failure",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A failed read or write against the remote cell store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("network error ({code}): {message}")]
    Network { code: NetworkCode, message: String },

    #[error("remote returned HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        /// Server-supplied `Retry-After` hint.
        retry_after: Option<Duration>,
    },

    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    pub fn network(code: NetworkCode, message: impl Into<String>) -> Self {
        Self::Network {
            code,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attach a `Retry-After` hint (only meaningful for HTTP errors).
    pub fn with_retry_after(self, hint: Duration) -> Self {
        match self {
            Self::Http {
                status, message, ..
            } => Self::Http {
                status,
                message,
                retry_after: Some(hint),
            },
            other => other,
        }
    }

    /// Whether another attempt may succeed.
    ///
    /// Transient network codes and statuses in [`RETRYABLE_STATUSES`] are
    /// retryable. Auth, permission, not-found, malformed requests and
    /// unclassified failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { code, .. } => code.is_transient(),
            Self::Http { status, .. } => RETRYABLE_STATUSES.contains(status),
            Self::Other(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
