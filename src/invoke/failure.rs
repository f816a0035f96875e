//! Live-path failure classification.
//!
//! Every error from the persistent service is mapped into [`CallFailure`] at
//! the I/O boundary, and [`CallFailure::route`] is the only place that decides
//! what happens next.
//!
//! | Failure | Route |
//! |---|---|
//! | connection refused / unreachable / network | fallback |
//! | timeout | retry (if configured), then fallback |
//! | non-2xx with decodable `error` body | surface |
//! | non-2xx without one / undecodable 2xx body | fallback |

use std::error::Error as _;
use std::io;

use serde::Deserialize;
use thiserror::Error;

/// What the invoker does with a [`CallFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the one-shot script.
    Fallback,
    /// Retry the live call if the path allows it, then run the script.
    RetryThenFallback,
    /// Return the failure to the caller; the script would fail the same way.
    Surface,
}

/// Why a live call produced no usable reply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallFailure {
    #[error("connection refused")]
    ConnectionRefused,

    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    /// Non-2xx with an `error` field the service meant for the caller.
    #[error("service error (HTTP {status}): {message}")]
    ServiceError {
        status: u16,
        message: String,
        language_unsupported: bool,
    },

    /// Non-2xx without a usable error body.
    #[error("unexpected HTTP {status}")]
    BadStatus { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed reply: {0}")]
    Decode(String),
}

impl CallFailure {
    pub fn route(&self) -> Route {
        match self {
            CallFailure::ConnectionRefused => Route::Fallback,
            CallFailure::Unreachable(_) => Route::Fallback,
            CallFailure::Timeout => Route::RetryThenFallback,
            CallFailure::ServiceError { .. } => Route::Surface,
            CallFailure::BadStatus { .. } => Route::Fallback,
            CallFailure::Network(_) => Route::Fallback,
            CallFailure::Decode(_) => Route::Fallback,
        }
    }

    /// Classify a non-2xx reply from its status and raw body.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<String>,
            #[serde(default)]
            language_unsupported: bool,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                error: Some(message),
                language_unsupported,
            }) => CallFailure::ServiceError {
                status,
                message,
                language_unsupported,
            },
            _ => CallFailure::BadStatus {
                status,
                body: body.chars().take(200).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for CallFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CallFailure::Timeout;
        }
        if err.is_connect() {
            return match io_kind(&err) {
                Some(io::ErrorKind::ConnectionRefused) => CallFailure::ConnectionRefused,
                Some(io::ErrorKind::TimedOut) => CallFailure::Timeout,
                _ => CallFailure::Unreachable(err.to_string()),
            };
        }
        if err.is_decode() {
            return CallFailure::Decode(err.to_string());
        }
        match io_kind(&err) {
            Some(io::ErrorKind::TimedOut) => CallFailure::Timeout,
            _ => CallFailure::Network(err.to_string()),
        }
    }
}

/// First `io::ErrorKind` in the source chain.
fn io_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = cause.source();
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
