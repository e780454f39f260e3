//! Host-facing plugin: method-call dispatch plus event channels.
//!
//! The plugin is the registrar. It owns the two relays and the notifier,
//! and builds a [`Session`] that refers to them through weak handles.
//!
//! # Channels
//!
//! | Channel | Kind | Payload |
//! |---------|------|---------|
//! | [`METHOD_CHANNEL`] | Method calls + control notifications | [`MethodCall`] / [`Notification`] |
//! | [`TEXT_EVENT_CHANNEL`] | Stream | `String` frames |
//! | [`BYTE_EVENT_CHANNEL`] | Stream | `Vec<u8>` frames |
//!
//! # Methods
//!
//! | Method | Arguments | Result |
//! |--------|-----------|--------|
//! | `connect` | `{ serverUrl, options?: { headers?, pingInterval? } }` | `true` |
//! | `disconnect` | `{ code?, reason? }` | `true` |
//! | `sendTextMessage` | `{ message: string }` | `true` |
//! | `sendByteMessage` | `{ message: bytes }` | `true` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::call::{decode_bytes, decode_connect, decode_disconnect, decode_text};
use crate::protocol::{CallError, MethodCall};
use crate::relay::{ControlNotifier, EventRelay};
use crate::session::Session;
use crate::transport::{Connector, TungsteniteConnector};

// ============================================================================
// Constants
// ============================================================================

/// Method-call and control-notification channel name.
pub const METHOD_CHANNEL: &str = "tech.sharpbitstudio.web_socket_support/methods";

/// Text frame stream channel name.
pub const TEXT_EVENT_CHANNEL: &str = "tech.sharpbitstudio.web_socket_support/text";

/// Byte frame stream channel name.
pub const BYTE_EVENT_CHANNEL: &str = "tech.sharpbitstudio.web_socket_support/byte";

// ============================================================================
// WebSocketPlugin
// ============================================================================

/// Registrar that wires a [`Session`] to the host's channels.
#[derive(Debug)]
pub struct WebSocketPlugin {
    session: Session,
    text_relay: Arc<EventRelay<String>>,
    byte_relay: Arc<EventRelay<Vec<u8>>>,
    notifier: Arc<ControlNotifier>,
}

impl WebSocketPlugin {
    /// Creates a plugin backed by the tungstenite transport.
    pub fn new() -> Result<Self> {
        Self::with_connector(Arc::new(TungsteniteConnector::new()))
    }

    /// Creates a plugin with a custom transport connector.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Result<Self> {
        let text_relay = Arc::new(EventRelay::new("text"));
        let byte_relay = Arc::new(EventRelay::new("byte"));
        let notifier = Arc::new(ControlNotifier::new());

        let session = Session::builder()
            .connector(connector)
            .text_relay(&text_relay)
            .byte_relay(&byte_relay)
            .notifier(&notifier)
            .build()?;

        Ok(Self {
            session,
            text_relay,
            byte_relay,
            notifier,
        })
    }

    /// Returns the session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the text frame relay.
    #[inline]
    #[must_use]
    pub fn text_relay(&self) -> &Arc<EventRelay<String>> {
        &self.text_relay
    }

    /// Returns the byte frame relay.
    #[inline]
    #[must_use]
    pub fn byte_relay(&self) -> &Arc<EventRelay<Vec<u8>>> {
        &self.byte_relay
    }

    /// Returns the control notifier.
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &Arc<ControlNotifier> {
        &self.notifier
    }

    /// Dispatches a method call.
    ///
    /// Returns `true` on success. Unknown methods yield `NOT_IMPLEMENTED`.
    pub fn handle(&self, call: &MethodCall) -> std::result::Result<Value, CallError> {
        let arguments = call.arguments.as_ref();

        let result = match call.method.as_str() {
            "connect" => decode_connect(arguments).and_then(|options| self.session.connect(options)),
            "disconnect" => {
                decode_disconnect(arguments).and_then(|request| self.session.disconnect(request))
            }
            "sendTextMessage" => {
                decode_text(arguments).and_then(|message| self.session.send_text(message))
            }
            "sendByteMessage" => {
                decode_bytes(arguments).and_then(|data| self.session.send_binary(data))
            }
            other => {
                warn!(method = other, "Unknown method");
                return Err(CallError::not_implemented(other));
            }
        };

        result.map(|()| Value::Bool(true)).map_err(|e| {
            if e.is_connection_error() {
                debug!(method = %call.method, error = %e, "Method call failed");
            } else {
                warn!(method = %call.method, error = %e, "Method call rejected");
            }
            CallError::from(e)
        })
    }

    /// Dispatches a method call received as a JSON envelope.
    ///
    /// A malformed envelope yields `INVALID_ARGUMENTS`.
    pub fn handle_json(&self, json: &str) -> std::result::Result<Value, CallError> {
        let call = MethodCall::from_json(json).map_err(|e| {
            warn!(error = %e, "Malformed method call");
            CallError::from(e)
        })?;
        self.handle(&call)
    }
}

// ============================================================================
// Tests
// ============================================================================
