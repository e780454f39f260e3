//! WebSocket Support - WebSocket client session bridge.
//!
//! This library exposes a WebSocket client to a host runtime through a
//! method-call / event-stream interface.
//!
//! # Architecture
//!
//! ```text
//!  Host                         Bridge                          Network
//! ┌──────────┐  MethodCall   ┌──────────────┐  Connector   ┌────────────┐
//! │          │ ────────────► │ WebSocket    │ ───────────► │ Transport  │
//! │          │               │ Plugin       │              │ Socket     │
//! │          │ ◄── text ──── │  └ Session   │ ◄── events ─ │ (tungst.)  │
//! │          │ ◄── bytes ─── │  └ Relays    │              │            │
//! │          │ ◄── control ─ │  └ Notifier  │              │            │
//! └──────────┘               └──────────────┘              └────────────┘
//! ```
//!
//! Key design principles:
//!
//! - A [`Session`] owns at most one transport at a time
//! - Inbound frames fan out to two independent single-subscriber streams
//! - Lifecycle events go to a single control listener
//! - No call blocks; outcomes arrive as notifications
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use web_socket_support::{MethodCall, Notification, Result, WebSocketPlugin};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let plugin = WebSocketPlugin::new()?;
//!     let mut control = plugin.notifier().listen();
//!     let mut text = plugin.text_relay().attach();
//!
//!     let _ = plugin.handle(&MethodCall::new(
//!         "connect",
//!         json!({ "serverUrl": "wss://echo.example/socket" }),
//!     ));
//!
//!     if let Some(Notification::Opened) = control.recv().await {
//!         let _ = plugin.handle(&MethodCall::new("sendTextMessage", json!({ "message": "hi" })));
//!         println!("echo: {:?}", text.recv().await);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`plugin`] | Host-facing call dispatch and channels |
//! | [`protocol`] | Calls, events, notifications |
//! | [`relay`] | Event relays and control notifier |
//! | [`session`] | Session lifecycle and options |
//! | [`transport`] | Transport seams and tungstenite implementation |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Host-facing plugin.
///
/// Use [`WebSocketPlugin::new()`] to create a plugin with its relays.
pub mod plugin;

/// Message types.
pub mod protocol;

/// Delivery points for frames and notifications.
pub mod relay;

/// Session lifecycle management.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Plugin types
pub use plugin::{BYTE_EVENT_CHANNEL, METHOD_CHANNEL, TEXT_EVENT_CHANNEL, WebSocketPlugin};

// Protocol types
pub use protocol::{CallError, InboundEvent, MethodCall, Notification, StreamError, StreamItem};

// Relay types
pub use relay::{ControlNotifier, EventRelay, NotificationStream, RelayStream};

// Session types
pub use session::{CloseRequest, ConnectOptions, Session, SessionBuilder, SessionState};

// Transport types
pub use transport::{Connector, EventSink, TransportSocket, TungsteniteConnector};
