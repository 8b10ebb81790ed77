//! Single-slot synchronous handoff.

use crate::{Result, RollcallError};
use tokio::sync::{mpsc, oneshot, Mutex};

struct Delivery<T> {
    item: T,
    collected: oneshot::Sender<()>,
}

/// One-item mailbox where the sender waits for the receiver.
///
/// `send` blocks while another item occupies the slot, and then until a
/// receiver has collected its own item. At most one item is outstanding,
/// and each item reaches exactly one receiver.
pub struct Handoff<T> {
    slot: mpsc::Sender<Delivery<T>>,
    inbox: Mutex<mpsc::Receiver<Delivery<T>>>,
}

impl<T> Handoff<T> {
    /// Create an empty handoff
    pub fn new() -> Self {
        let (slot, inbox) = mpsc::channel(1);
        Self {
            slot,
            inbox: Mutex::new(inbox),
        }
    }

    /// Hand `item` over, returning once a receiver has collected it.
    pub async fn send(&self, item: T) -> Result<()> {
        let (collected, on_collected) = oneshot::channel();
        self.slot
            .send(Delivery { item, collected })
            .await
            .map_err(|_| RollcallError::internal("handoff receiver closed"))?;
        on_collected
            .await
            .map_err(|_| RollcallError::internal("handoff item dropped before collection"))
    }

    /// Wait for the next item.
    ///
    /// Concurrent receivers queue up; each item goes to exactly one of them.
    pub async fn recv(&self) -> Result<T> {
        let mut inbox = self.inbox.lock().await;
        let delivery = inbox
            .recv()
            .await
            .ok_or_else(|| RollcallError::internal("handoff sender closed"))?;
        // The sender may have given up waiting; the item is still delivered.
        let _ = delivery.collected.send(());
        Ok(delivery.item)
    }

    /// Whether an item sits in the slot waiting for a receiver.
    pub fn is_occupied(&self) -> bool {
        self.slot.capacity() == 0
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Handoff<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("occupied", &self.is_occupied())
            .finish()
    }
}
