//! Delivery points between the session and its consumers.
//!
//! Both delivery points share a single-subscriber model:
//!
//! - At most one subscriber is attached; attaching again replaces it
//! - Publishing hands the item to the subscriber's unbounded channel and
//!   returns immediately; the subscriber drains it on its own task
//! - With no subscriber attached, items are dropped, never queued
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EventRelay`] | Text or byte frame stream with terminal errors |
//! | [`ControlNotifier`] | Lifecycle notifications |

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::mpsc;

// ============================================================================
// Submodules
// ============================================================================

/// Control-channel lifecycle notifications.
pub mod notifier;

/// Single-subscriber frame streams.
pub mod stream;

// ============================================================================
// Re-exports
// ============================================================================

pub use notifier::{ControlNotifier, NotificationStream};
pub use stream::{EventRelay, RelayStream};

// ============================================================================
// Slot
// ============================================================================

/// Holds the sender half of the current subscriber's channel.
///
/// The lock is held across the (non-blocking) send so concurrent
/// publishers cannot interleave a single item with a subscriber swap.
pub(crate) struct Slot<T> {
    sender: Mutex<Option<mpsc::UnboundedSender<T>>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }
}

impl<T> Slot<T> {
    /// Installs a new subscriber, dropping the previous sender.
    pub(crate) fn attach(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock() = Some(tx);
        rx
    }

    /// Removes the subscriber. Returns `true` if one was attached.
    pub(crate) fn detach(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    /// Returns `true` if a live subscriber is attached.
    pub(crate) fn is_attached(&self) -> bool {
        matches!(&*self.sender.lock(), Some(tx) if !tx.is_closed())
    }

    /// Hands `item` to the subscriber. Returns `true` if it was accepted.
    ///
    /// A subscriber whose receiver is gone is detached.
    pub(crate) fn deliver(&self, item: T) -> bool {
        let mut guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        if tx.send(item).is_err() {
            *guard = None;
            return false;
        }

        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_without_subscriber() {
        let slot: Slot<u8> = Slot::default();
        assert!(!slot.deliver(1));
        assert!(!slot.is_attached());
    }

    #[test]
    fn test_dropped_receiver_detaches() {
        let slot: Slot<u8> = Slot::default();
        let rx = slot.attach();
        assert!(slot.is_attached());

        drop(rx);
        assert!(!slot.is_attached());
        assert!(!slot.deliver(1));
        assert!(!slot.detach());
    }

    #[test]
    fn test_attach_replaces_previous() {
        let slot: Slot<u8> = Slot::default();
        let mut first = slot.attach();
        let mut second = slot.attach();

        assert!(slot.deliver(7));
        assert_eq!(second.try_recv().ok(), Some(7));
        // Old sender was dropped, so the first channel is disconnected.
        assert!(first.try_recv().is_err());
    }
}
