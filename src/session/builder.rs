//! Builder pattern for session configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use web_socket_support::{ControlNotifier, EventRelay, Session};
//!
//! # fn example() -> web_socket_support::Result<()> {
//! let text = Arc::new(EventRelay::new("text"));
//! let bytes = Arc::new(EventRelay::new("byte"));
//! let notifier = Arc::new(ControlNotifier::new());
//!
//! let session = Session::builder()
//!     .text_relay(&text)
//!     .byte_relay(&bytes)
//!     .notifier(&notifier)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::relay::{ControlNotifier, EventRelay};
use crate::transport::{Connector, TungsteniteConnector};

use super::core::Session;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// The session only keeps weak handles to the relays and notifier; the
/// caller must keep the `Arc`s alive.
#[derive(Default)]
pub struct SessionBuilder {
    connector: Option<Arc<dyn Connector>>,
    text_relay: Option<Weak<EventRelay<String>>>,
    byte_relay: Option<Weak<EventRelay<Vec<u8>>>>,
    notifier: Option<Weak<ControlNotifier>>,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("custom_connector", &self.connector.is_some())
            .field("text_relay", &self.text_relay.is_some())
            .field("byte_relay", &self.byte_relay.is_some())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl SessionBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport connector. Defaults to [`TungsteniteConnector`].
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the text frame relay.
    #[inline]
    #[must_use]
    pub fn text_relay(mut self, relay: &Arc<EventRelay<String>>) -> Self {
        self.text_relay = Some(Arc::downgrade(relay));
        self
    }

    /// Sets the binary frame relay.
    #[inline]
    #[must_use]
    pub fn byte_relay(mut self, relay: &Arc<EventRelay<Vec<u8>>>) -> Self {
        self.byte_relay = Some(Arc::downgrade(relay));
        self
    }

    /// Sets the control notifier.
    #[inline]
    #[must_use]
    pub fn notifier(mut self, notifier: &Arc<ControlNotifier>) -> Self {
        self.notifier = Some(Arc::downgrade(notifier));
        self
    }

    /// Builds the session with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if a relay or the notifier is not set
    pub fn build(self) -> Result<Session> {
        let text_relay = self
            .text_relay
            .ok_or_else(|| Error::invalid_argument("Text relay is required"))?;
        let byte_relay = self
            .byte_relay
            .ok_or_else(|| Error::invalid_argument("Byte relay is required"))?;
        let notifier = self
            .notifier
            .ok_or_else(|| Error::invalid_argument("Control notifier is required"))?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TungsteniteConnector::new()) as Arc<dyn Connector>);

        Ok(Session::new(connector, text_relay, byte_relay, notifier))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_relays() {
        let err = SessionBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("Text relay"));
    }

    #[test]
    fn test_build_requires_notifier() {
        let text = Arc::new(EventRelay::new("text"));
        let bytes = Arc::new(EventRelay::new("byte"));

        let err = SessionBuilder::new()
            .text_relay(&text)
            .byte_relay(&bytes)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_build_with_defaults() {
        let text = Arc::new(EventRelay::new("text"));
        let bytes = Arc::new(EventRelay::new("byte"));
        let notifier = Arc::new(ControlNotifier::new());

        let builder = SessionBuilder::new()
            .text_relay(&text)
            .byte_relay(&bytes)
            .notifier(&notifier);
        assert!(format!("{builder:?}").contains("custom_connector: false"));

        let session = builder.build().expect("session");
        assert_eq!(session.state(), crate::session::SessionState::Idle);
    }
}
