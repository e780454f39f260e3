//! Core session implementation.
//!
//! A [`Session`] manages one logical WebSocket connection:
//!
//! ```text
//! Idle ──connect──► Connecting ──Opened──► Open ──disconnect──► Closing
//!                        │                   │                     │
//!                        └──Closed/Failed────┴──Closed/Failed──────┴──► Closed
//! ```
//!
//! `connect` from any state tears down the owned transport (if any) and
//! starts over in `Connecting`.
//!
//! # Thread Safety
//!
//! API calls and transport events may arrive on different threads. Every
//! state transition happens under one mutex; delivery to relays and the
//! notifier happens after the lock is released and never blocks.
//!
//! # Limitations
//!
//! There is no connect timeout. A handshake that never completes leaves the
//! session in `Connecting` until `disconnect` or another `connect`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::event::{
    ABNORMAL_CLOSE_CODE, CANCELLED_REASON, NORMAL_CLOSE_CODE, PEER_CLOSED_REASON,
};
use crate::protocol::{InboundEvent, Notification, StreamError};
use crate::relay::{ControlNotifier, EventRelay};
use crate::transport::{Connector, EventSink, TransportSocket};

use super::builder::SessionBuilder;
use super::options::{CloseRequest, ConnectOptions, DEFAULT_CLOSE_CODE, DEFAULT_CLOSE_REASON};

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Never connected.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Connection open.
    Open,
    /// Close requested, waiting for the transport.
    Closing,
    /// Transport released.
    Closed,
}

impl SessionState {
    /// Returns `true` if outbound frames are accepted in this state.
    #[inline]
    #[must_use]
    pub fn accepts_writes(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Types
// ============================================================================

/// The transport currently owned by the session.
struct OwnedSocket {
    id: ConnectionId,
    socket: Box<dyn TransportSocket>,
}

/// State guarded by the session mutex.
struct SessionCore {
    state: SessionState,
    socket: Option<OwnedSocket>,
}

impl SessionCore {
    fn current_id(&self) -> Option<ConnectionId> {
        self.socket.as_ref().map(|owned| owned.id)
    }

    fn writable(&self) -> Result<&dyn TransportSocket> {
        match &self.socket {
            Some(owned) if self.state.accepts_writes() => Ok(owned.socket.as_ref()),
            _ => Err(Error::NotConnected),
        }
    }

    fn release(&mut self) {
        self.socket = None;
        self.state = SessionState::Closed;
    }
}

/// What to deliver once the lock is released.
enum Delivery {
    Notify(Notification),
    Text(String),
    Binary(Vec<u8>),
    Failure { kind: String, message: String },
}

/// Shared session state.
pub(crate) struct SessionInner {
    core: Mutex<SessionCore>,
    connector: Arc<dyn Connector>,
    text_relay: Weak<EventRelay<String>>,
    byte_relay: Weak<EventRelay<Vec<u8>>>,
    notifier: Weak<ControlNotifier>,
}

// ============================================================================
// Session
// ============================================================================

/// A single-connection WebSocket session.
///
/// Cheap to clone; clones share the same connection.
///
/// # Example
///
/// ```ignore
/// session.connect(ConnectOptions::parse("wss://echo.example/socket")?)?;
/// // ... wait for Notification::Opened on the notifier ...
/// session.send_text("hi")?;
/// session.disconnect(CloseRequest::default())?;
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("Session")
            .field("state", &core.state)
            .field("connection_id", &core.current_id())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        text_relay: Weak<EventRelay<String>>,
        byte_relay: Weak<EventRelay<Vec<u8>>>,
        notifier: Weak<ControlNotifier>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                core: Mutex::new(SessionCore {
                    state: SessionState::Idle,
                    socket: None,
                }),
                connector,
                text_relay,
                byte_relay,
                notifier,
            }),
        }
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Returns the ID of the owned transport, if any.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.inner.core.lock().current_id()
    }

    /// Starts a connection attempt.
    ///
    /// Any owned transport is closed first with the default close code.
    /// The host gets no [`Notification::Closed`] for that replaced
    /// connection: its remaining events, including its close, are ignored.
    /// Returns once the attempt has started; the outcome arrives as
    /// [`Notification::Opened`] or a failure/close notification.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the handshake request cannot be built
    pub fn connect(&self, options: ConnectOptions) -> Result<()> {
        let id = ConnectionId::next();
        let events = self.event_sink(id);

        let mut core = self.inner.core.lock();

        if let Some(previous) = core.socket.take() {
            debug!(connection_id = %previous.id, "Tearing down previous transport");
            if let Err(e) = previous
                .socket
                .close(DEFAULT_CLOSE_CODE, DEFAULT_CLOSE_REASON)
            {
                debug!(connection_id = %previous.id, error = %e, "Best-effort close failed");
            }
            core.state = SessionState::Closed;
        }

        let socket = self.inner.connector.open(id, &options, events)?;

        core.socket = Some(OwnedSocket { id, socket });
        core.state = SessionState::Connecting;

        info!(connection_id = %id, url = %options.server_url, "Connecting");
        Ok(())
    }

    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no transport is connecting or open
    pub fn send_text(&self, message: impl Into<String>) -> Result<()> {
        let core = self.inner.core.lock();
        core.writable()?.send_text(message.into())
    }

    /// Sends a binary frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no transport is connecting or open
    pub fn send_binary(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        let core = self.inner.core.lock();
        core.writable()?.send_binary(data.into())
    }

    /// Requests a graceful close.
    ///
    /// A no-op when there is no transport or it is already closing.
    /// Sends are rejected from this point on; [`Notification::Closed`]
    /// follows once the transport finishes.
    pub fn disconnect(&self, request: CloseRequest) -> Result<()> {
        let mut core = self.inner.core.lock();

        let Some(owned) = core.socket.as_ref().filter(|_| core.state.accepts_writes()) else {
            debug!(state = %core.state, "Disconnect without live transport, ignoring");
            return Ok(());
        };

        if let Err(e) = owned.socket.close(request.code, &request.reason) {
            debug!(connection_id = %owned.id, error = %e, "Close request not delivered");
        }

        debug!(connection_id = %owned.id, code = request.code, "Disconnect requested");
        core.state = SessionState::Closing;
        Ok(())
    }
}

// ============================================================================
// Session - Event Ingestion
// ============================================================================

impl Session {
    /// Creates the sink the transport for `id` reports through.
    fn event_sink(&self, id: ConnectionId) -> EventSink {
        let inner = Arc::downgrade(&self.inner);
        EventSink::new(move |event| {
            if let Some(inner) = inner.upgrade() {
                inner.handle_event(id, event);
            }
        })
    }
}

impl SessionInner {
    /// Applies an inbound event, then delivers its effects.
    fn handle_event(&self, id: ConnectionId, event: InboundEvent) {
        let delivery = {
            let mut core = self.core.lock();

            if core.current_id() != Some(id) {
                trace!(connection_id = %id, ?event, "Event from stale transport ignored");
                return;
            }

            match event {
                InboundEvent::Opened => {
                    if core.state == SessionState::Connecting {
                        core.state = SessionState::Open;
                    }
                    info!(connection_id = %id, "Connection opened");
                    Delivery::Notify(Notification::Opened)
                }

                InboundEvent::TextFrame(text) => Delivery::Text(text),

                InboundEvent::BinaryFrame(data) => Delivery::Binary(data),

                InboundEvent::Closed { code, reason } => {
                    core.release();
                    info!(connection_id = %id, code, %reason, "Connection closed");
                    Delivery::Notify(Notification::closed(code, reason))
                }

                InboundEvent::Cancelled => {
                    core.release();
                    info!(connection_id = %id, "Connection cancelled");
                    Delivery::Notify(Notification::closed(NORMAL_CLOSE_CODE, CANCELLED_REASON))
                }

                InboundEvent::PeerClosed => {
                    core.release();
                    info!(connection_id = %id, "Peer closed connection");
                    Delivery::Notify(Notification::closed(NORMAL_CLOSE_CODE, PEER_CLOSED_REASON))
                }

                InboundEvent::Failed { kind, message } => {
                    core.release();
                    warn!(connection_id = %id, %kind, %message, "Connection failed");
                    Delivery::Failure { kind, message }
                }
            }
        };

        self.deliver(delivery);
    }

    /// Hands the effects of an event to the relays and notifier.
    fn deliver(&self, delivery: Delivery) {
        match delivery {
            Delivery::Notify(notification) => self.notify(notification),

            Delivery::Text(text) => {
                if let Some(relay) = self.text_relay.upgrade() {
                    relay.publish(text);
                }
            }

            Delivery::Binary(data) => {
                if let Some(relay) = self.byte_relay.upgrade() {
                    relay.publish(data);
                }
            }

            Delivery::Failure { kind, message } => {
                self.notify(Notification::failure(&kind, message.clone()));

                if let Some(relay) = self.text_relay.upgrade() {
                    relay.publish_error(StreamError::websocket(message.clone()));
                }
                if let Some(relay) = self.byte_relay.upgrade() {
                    relay.publish_error(StreamError::websocket(message.clone()));
                }

                self.notify(Notification::closed(ABNORMAL_CLOSE_CODE, message));
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.notify(notification);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
