//! Message types exchanged with the host and the transport.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `MethodCall` | Host → Session | Command request |
//! | `CallError` | Session → Host | Command failure |
//! | `InboundEvent` | Transport → Session | Socket lifecycle and frames |
//! | `Notification` | Session → Host | Control-channel lifecycle event |
//! | `StreamItem` | Session → Host | Text/byte stream payload or terminal error |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `call` | Method calls, call errors, argument decoding |
//! | `event` | Inbound events, notifications, stream items |

// ============================================================================
// Submodules
// ============================================================================

/// Method calls and argument decoding.
pub mod call;

/// Event message types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use call::{CallError, MethodCall};
pub use event::{InboundEvent, Notification, StreamError, StreamItem};
