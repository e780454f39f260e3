//! Event message types.
//!
//! Inbound events flow from the transport to the session. Notifications
//! and stream items flow from the session to the host.
//!
//! # Notification Wire Format
//!
//! | Method | Arguments |
//! |--------|-----------|
//! | `onOpened` | `{}` |
//! | `onClosed` | `{ "code": int, "reason": string }` |
//! | `onFailure` | `{ "throwableType": string, "errorMessage": string, "causeMessage": string }` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::error::{classify, normalize_kind};

// ============================================================================
// Constants
// ============================================================================

/// Error code carried by terminal stream errors.
pub const WEBSOCKET_ERROR_CODE: &str = "WEBSOCKET_ERROR";

/// Close code reported when the transport gives none.
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Close code reported after a transport failure.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Reason reported for a cancelled connection.
pub const CANCELLED_REASON: &str = "Connection cancelled";

/// Reason reported when the peer went away without a close frame.
pub const PEER_CLOSED_REASON: &str = "Peer closed";

// ============================================================================
// InboundEvent
// ============================================================================

/// A lifecycle or data event produced by a transport socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Handshake completed.
    Opened,

    /// Text frame received.
    TextFrame(String),

    /// Binary frame received.
    BinaryFrame(Vec<u8>),

    /// Close handshake completed.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Connection failed.
    Failed {
        /// Stable error-kind tag.
        kind: String,
        /// Human-readable description.
        message: String,
    },

    /// Connection attempt was cancelled locally before it opened.
    Cancelled,

    /// Peer dropped the connection without a close frame.
    PeerClosed,
}

impl InboundEvent {
    /// Creates a failure event, normalizing an empty kind.
    #[inline]
    #[must_use]
    pub fn failed(kind: impl AsRef<str>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: normalize_kind(kind.as_ref()).to_string(),
            message: message.into(),
        }
    }

    /// Creates a failure event from a WebSocket library error.
    #[must_use]
    pub fn from_ws_error(err: &WsError) -> Self {
        Self::failed(classify(err), err.to_string())
    }

    /// Returns `true` if no further events follow this one.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. } | Self::Failed { .. } | Self::Cancelled | Self::PeerClosed
        )
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A control-channel lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Connection opened.
    Opened,

    /// Connection closed.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Connection failed.
    Failure {
        /// Error-kind tag.
        throwable_type: String,
        /// Human-readable description.
        error_message: String,
        /// Underlying cause description.
        cause_message: String,
    },
}

impl Notification {
    /// Creates a closed notification.
    #[inline]
    #[must_use]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a failure notification where the cause mirrors the message.
    #[inline]
    #[must_use]
    pub fn failure(kind: impl AsRef<str>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Failure {
            throwable_type: normalize_kind(kind.as_ref()).to_string(),
            cause_message: message.clone(),
            error_message: message,
        }
    }

    /// Returns the host-side method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Opened => "onOpened",
            Self::Closed { .. } => "onClosed",
            Self::Failure { .. } => "onFailure",
        }
    }

    /// Returns the host-side argument map.
    #[must_use]
    pub fn arguments(&self) -> Value {
        match self {
            Self::Opened => json!({}),
            Self::Closed { code, reason } => json!({ "code": code, "reason": reason }),
            Self::Failure {
                throwable_type,
                error_message,
                cause_message,
            } => json!({
                "throwableType": throwable_type,
                "errorMessage": error_message,
                "causeMessage": cause_message,
            }),
        }
    }

    /// Returns the full `{ method, arguments }` message.
    #[inline]
    #[must_use]
    pub fn to_message(&self) -> Value {
        json!({ "method": self.method(), "arguments": self.arguments() })
    }
}

// ============================================================================
// StreamError
// ============================================================================

/// Terminal error delivered on a data stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    /// Always [`WEBSOCKET_ERROR_CODE`].
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl StreamError {
    /// Creates a WebSocket stream error.
    #[inline]
    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self {
            code: WEBSOCKET_ERROR_CODE.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// StreamItem
// ============================================================================

/// An item delivered on a data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem<T> {
    /// Payload.
    Event(T),
    /// Terminal error for the current connection.
    Error(StreamError),
}

impl<T> StreamItem<T> {
    /// Returns the payload, if any.
    #[inline]
    #[must_use]
    pub fn into_event(self) -> Option<T> {
        match self {
            Self::Event(event) => Some(event),
            Self::Error(_) => None,
        }
    }

    /// Returns `true` if this is an error item.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_normalizes_empty_kind() {
        let event = InboundEvent::failed("", "boom");
        assert_eq!(
            event,
            InboundEvent::Failed {
                kind: "UnknownError".into(),
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_from_ws_error() {
        let event = InboundEvent::from_ws_error(&WsError::ConnectionClosed);
        match event {
            InboundEvent::Failed { kind, .. } => assert_eq!(kind, "ConnectionClosed"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(!InboundEvent::Opened.is_terminal());
        assert!(!InboundEvent::TextFrame("x".into()).is_terminal());
        assert!(InboundEvent::Cancelled.is_terminal());
        assert!(InboundEvent::PeerClosed.is_terminal());
    }

    #[test]
    fn test_notification_messages() {
        assert_eq!(
            Notification::Opened.to_message(),
            json!({ "method": "onOpened", "arguments": {} })
        );
        assert_eq!(
            Notification::closed(1001, "bye").to_message(),
            json!({ "method": "onClosed", "arguments": { "code": 1001, "reason": "bye" } })
        );
    }

    #[test]
    fn test_failure_arguments() {
        let args = Notification::failure("timeout", "handshake timed out").arguments();
        assert_eq!(args["throwableType"], "timeout");
        assert_eq!(args["errorMessage"], "handshake timed out");
        assert_eq!(args["causeMessage"], "handshake timed out");
    }

    #[test]
    fn test_stream_error_serialization() {
        let value = serde_json::to_value(StreamError::websocket("gone")).expect("serialize");
        assert_eq!(value, json!({ "code": "WEBSOCKET_ERROR", "message": "gone" }));
    }
}
