//! WebSocket transport layer.
//!
//! The session never talks to a socket library directly. It goes through
//! two seams:
//!
//! - [`Connector`] opens a transport for a set of [`ConnectOptions`]
//! - [`TransportSocket`] accepts outbound frames and a close request
//!
//! Inbound traffic flows back through an [`EventSink`] as [`InboundEvent`]s,
//! emitted from the transport's own task.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   send_text / close    ┌──────────────────────┐
//! │     Session     │ ─────────────────────► │  TransportSocket     │
//! │                 │                        │  (Connection task)   │
//! │  handle_event   │ ◄───────────────────── │                      │
//! └─────────────────┘   EventSink::emit      └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | tokio-tungstenite connection and event loop |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::InboundEvent;
use crate::session::ConnectOptions;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// In-memory transport for tests.
#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, TungsteniteConnector};

// ============================================================================
// EventSink
// ============================================================================

/// Callback through which a transport reports inbound events.
///
/// Cheap to clone. Emitting never blocks on consumers.
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<dyn Fn(InboundEvent) + Send + Sync>,
}

impl EventSink {
    /// Creates a sink from a callback.
    pub fn new(callback: impl Fn(InboundEvent) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(callback),
        }
    }

    /// Reports an event.
    #[inline]
    pub fn emit(&self, event: InboundEvent) {
        (self.inner)(event);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

// ============================================================================
// TransportSocket
// ============================================================================

/// A live (or connecting) WebSocket owned by a session.
///
/// All methods are fire-and-forget: they hand the frame to the transport
/// and return without waiting for the wire.
pub trait TransportSocket: Send + Sync {
    /// Queues a text frame.
    fn send_text(&self, text: String) -> Result<()>;

    /// Queues a binary frame.
    fn send_binary(&self, data: Vec<u8>) -> Result<()>;

    /// Requests a graceful close.
    ///
    /// `code` and `reason` are advisory; a transport may not propagate them.
    fn close(&self, code: u16, reason: &str) -> Result<()>;
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transport sockets.
pub trait Connector: Send + Sync {
    /// Starts an asynchronous connection attempt.
    ///
    /// Must return promptly. Fails only when the request itself cannot be
    /// built; connection failures are reported later through `events`.
    ///
    /// Must not emit through `events` before returning: the session holds
    /// its state lock across this call.
    fn open(
        &self,
        id: ConnectionId,
        options: &ConnectOptions,
        events: EventSink,
    ) -> Result<Box<dyn TransportSocket>>;
}
