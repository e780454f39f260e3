//! Error types for the WebSocket session bridge.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use web_socket_support::{ConnectOptions, Result};
//!
//! fn example(session: &Session) -> Result<()> {
//!     session.connect(ConnectOptions::parse("wss://echo.example/socket")?)?;
//!     session.send_text("hi")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Surfaced |
//! |----------|----------|----------|
//! | Input | [`Error::InvalidArgument`], [`Error::Url`], [`Error::Json`] | Synchronously |
//! | Lifecycle | [`Error::NotConnected`] | Synchronously |
//! | Transport | [`Error::TransportFailure`] | Via notifications |

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Constants
// ============================================================================

/// Tag used when a transport error cannot be classified.
pub const UNKNOWN_ERROR_KIND: &str = "UnknownError";

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Malformed or missing call input.
    ///
    /// Returned synchronously, e.g. for an unparsable server URL.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation attempted with no live transport.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Failure reported by the underlying socket.
    #[error("Transport failure ({kind}): {message}")]
    TransportFailure {
        /// Stable error-kind tag (see [`classify`]).
        kind: String,
        /// Human-readable description.
        message: String,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a transport failure error.
    #[inline]
    pub fn transport_failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error was caused by bad caller input.
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::Url(_) | Self::Json(_)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::NotConnected | Self::TransportFailure { .. })
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Maps a WebSocket library error onto a stable error-kind tag.
///
/// Best-effort: anything not recognized becomes [`UNKNOWN_ERROR_KIND`].
#[must_use]
pub fn classify(err: &WsError) -> &'static str {
    match err {
        WsError::Io(e) if e.kind() == ErrorKind::TimedOut => "timeout",
        WsError::Io(_) => "IoError",
        WsError::ConnectionClosed | WsError::AlreadyClosed => "ConnectionClosed",
        WsError::Protocol(_) => "ProtocolError",
        WsError::Capacity(_) => "CapacityError",
        WsError::Url(_) => "UrlError",
        WsError::Http(_) | WsError::HttpFormat(_) => "HttpError",
        #[allow(unreachable_patterns)]
        _ => UNKNOWN_ERROR_KIND,
    }
}

/// Normalizes a caller-supplied kind tag, falling back to [`UNKNOWN_ERROR_KIND`].
#[inline]
#[must_use]
pub fn normalize_kind(kind: &str) -> &str {
    if kind.trim().is_empty() {
        UNKNOWN_ERROR_KIND
    } else {
        kind
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Error as IoError;

    use tokio_tungstenite::tungstenite::error::ProtocolError;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("Missing serverUrl");
        assert_eq!(err.to_string(), "Invalid argument: Missing serverUrl");

        let err = Error::transport_failure("timeout", "handshake timed out");
        assert_eq!(
            err.to_string(),
            "Transport failure (timeout): handshake timed out"
        );
    }

    #[test]
    fn test_is_invalid_argument() {
        let url_err: Error = url::Url::parse("").unwrap_err().into();

        assert!(Error::invalid_argument("x").is_invalid_argument());
        assert!(url_err.is_invalid_argument());
        assert!(!Error::NotConnected.is_invalid_argument());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::transport_failure("IoError", "reset").is_connection_error());
        assert!(!Error::invalid_argument("x").is_connection_error());
    }

    #[test]
    fn test_classify_io_timeout() {
        let err = WsError::Io(IoError::new(ErrorKind::TimedOut, "timed out"));
        assert_eq!(classify(&err), "timeout");

        let err = WsError::Io(IoError::new(ErrorKind::ConnectionReset, "reset"));
        assert_eq!(classify(&err), "IoError");
    }

    #[test]
    fn test_classify_library_errors() {
        assert_eq!(classify(&WsError::ConnectionClosed), "ConnectionClosed");
        assert_eq!(classify(&WsError::AlreadyClosed), "ConnectionClosed");
        assert_eq!(
            classify(&WsError::Protocol(ProtocolError::HandshakeIncomplete)),
            "ProtocolError"
        );
    }

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind(""), UNKNOWN_ERROR_KIND);
        assert_eq!(normalize_kind("  "), UNKNOWN_ERROR_KIND);
        assert_eq!(normalize_kind("timeout"), "timeout");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
