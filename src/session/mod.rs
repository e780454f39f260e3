//! WebSocket session management.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Owns one transport, runs the lifecycle state machine |
//! | [`SessionBuilder`] | Fluent configuration builder |
//! | [`ConnectOptions`] | Server URL, handshake headers, keepalive |
//! | [`CloseRequest`] | Close code and reason |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use web_socket_support::{
//!     CloseRequest, ConnectOptions, ControlNotifier, EventRelay, Notification, Session,
//! };
//!
//! # async fn example() -> web_socket_support::Result<()> {
//! let text = Arc::new(EventRelay::new("text"));
//! let bytes = Arc::new(EventRelay::new("byte"));
//! let notifier = Arc::new(ControlNotifier::new());
//! let mut control = notifier.listen();
//!
//! let session = Session::builder()
//!     .text_relay(&text)
//!     .byte_relay(&bytes)
//!     .notifier(&notifier)
//!     .build()?;
//!
//! session.connect(ConnectOptions::parse("wss://echo.example/socket")?)?;
//! if let Some(Notification::Opened) = control.recv().await {
//!     session.send_text("hi")?;
//! }
//! session.disconnect(CloseRequest::default())?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for session configuration.
pub mod builder;

/// Core session implementation.
pub mod core;

/// Connection and close options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionBuilder;
pub use self::core::{Session, SessionState};
pub use options::{
    CloseRequest, ConnectOptions, DEFAULT_CLOSE_CODE, DEFAULT_CLOSE_REASON, MAX_PING_INTERVAL,
};
