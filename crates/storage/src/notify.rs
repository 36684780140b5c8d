//! Change notifications between owners of the same cookie jar.

use shared::protocol::StorageChange;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Source of [`StorageChange`] notifications a store can register with.
pub trait ChangeSource {
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

#[derive(Debug, Clone)]
pub struct StorageChangeHub {
    tx: broadcast::Sender<StorageChange>,
}

impl Default for StorageChangeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StorageChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers that will see the change.
    pub fn publish(&self, change: StorageChange) -> usize {
        match self.tx.send(change) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }
}

impl ChangeSource for StorageChangeHub {
    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }
}
