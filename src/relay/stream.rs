//! Single-subscriber frame streams.
//!
//! The session owns no relay; it publishes into them through weak handles.
//!
//! # Error Policy
//!
//! [`EventRelay::publish_error`] delivers a terminal error for the current
//! connection but does **not** detach the subscriber. The same stream keeps
//! receiving frames from a later connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::{StreamError, StreamItem};

use super::Slot;

// ============================================================================
// EventRelay
// ============================================================================

/// Single-subscriber broadcast point for one category of inbound payload.
pub struct EventRelay<T> {
    /// Name used in logs (`text`, `byte`).
    name: &'static str,
    slot: Slot<StreamItem<T>>,
}

impl<T> fmt::Debug for EventRelay<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRelay")
            .field("name", &self.name)
            .field("attached", &self.has_subscriber())
            .finish()
    }
}

impl<T> EventRelay<T> {
    /// Creates a relay with no subscriber.
    #[inline]
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Slot::default(),
        }
    }

    /// Returns the relay name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Attaches a subscriber, replacing any existing one.
    ///
    /// The previous stream stops receiving items and ends.
    pub fn attach(&self) -> RelayStream<T> {
        trace!(relay = self.name, "Subscriber attached");
        RelayStream {
            rx: self.slot.attach(),
        }
    }

    /// Removes the subscriber; later publishes are no-ops.
    pub fn detach(&self) {
        if self.slot.detach() {
            trace!(relay = self.name, "Subscriber detached");
        }
    }

    /// Returns `true` if a subscriber is attached.
    #[inline]
    #[must_use]
    pub fn has_subscriber(&self) -> bool {
        self.slot.is_attached()
    }

    /// Publishes a payload. Never blocks, never fails.
    pub fn publish(&self, event: T) {
        if !self.slot.deliver(StreamItem::Event(event)) {
            trace!(relay = self.name, "No subscriber, event dropped");
        }
    }

    /// Publishes a terminal error for the current connection.
    pub fn publish_error(&self, error: StreamError) {
        if !self.slot.deliver(StreamItem::Error(error)) {
            trace!(relay = self.name, "No subscriber, error dropped");
        }
    }
}

// ============================================================================
// RelayStream
// ============================================================================

/// Subscriber end of an [`EventRelay`].
///
/// Ends when the relay detaches it or attaches a replacement.
pub struct RelayStream<T> {
    rx: mpsc::UnboundedReceiver<StreamItem<T>>,
}

impl<T> RelayStream<T> {
    /// Receives the next item.
    pub async fn recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.recv().await
    }

    /// Receives the next item if one is ready.
    pub fn try_recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for RelayStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> fmt::Debug for RelayStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
