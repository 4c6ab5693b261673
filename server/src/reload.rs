//! Reload notifications for connected dev clients.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Messages a slow listener may have queued before it starts missing them.
pub const LISTENER_CAPACITY: usize = 8;

/// Fans one message out to every listener without ever waiting on one.
#[derive(Default)]
pub struct ReloadHub {
    listeners: Mutex<Vec<mpsc::Sender<u64>>>,
    generation: AtomicU64,
}

impl ReloadHub {
    pub fn new() -> Self { Self::default() }

    pub fn subscribe(&self) -> mpsc::Receiver<u64> {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        self.listeners.lock().push(tx);
        rx
    }

    /// Announce a new generation. Full listeners miss it; closed ones are
    /// dropped. Returns the generation number sent.
    pub fn broadcast(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| match tx.try_send(generation) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(generation, "reload listener is full, message dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        tracing::debug!(generation, listeners = listeners.len(), "reload broadcast");
        generation
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
