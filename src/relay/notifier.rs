//! Control-channel lifecycle notifications.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::Notification;

use super::Slot;

// ============================================================================
// ControlNotifier
// ============================================================================

/// Delivers lifecycle notifications to a single listener.
///
/// Notifications sent with no listener registered are dropped.
#[derive(Default)]
pub struct ControlNotifier {
    slot: Slot<Notification>,
}

impl fmt::Debug for ControlNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlNotifier")
            .field("listening", &self.has_listener())
            .finish()
    }
}

impl ControlNotifier {
    /// Creates a notifier with no listener.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the listener, replacing any existing one.
    pub fn listen(&self) -> NotificationStream {
        NotificationStream {
            rx: self.slot.attach(),
        }
    }

    /// Unregisters the listener.
    pub fn unlisten(&self) {
        self.slot.detach();
    }

    /// Returns `true` if a listener is registered.
    #[inline]
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.slot.is_attached()
    }

    /// Sends a notification without waiting for the listener.
    pub fn notify(&self, notification: Notification) {
        let method = notification.method();
        if !self.slot.deliver(notification) {
            trace!(method, "No listener, notification dropped");
        }
    }
}

// ============================================================================
// NotificationStream
// ============================================================================

/// Listener end of a [`ControlNotifier`].
pub struct NotificationStream {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationStream {
    /// Receives the next notification.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Receives the next notification if one is ready.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for NotificationStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
