//! Shell side of the Crux `Render` effect.
//!
//! Each render request publishes the core's current `ViewModel`. The view is
//! taken inside the channel's write lock, so concurrent publishes land in
//! the order the core produced them.
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::model::ViewModel;

#[derive(Debug)]
pub struct ViewChannel {
    tx: watch::Sender<ViewModel>,
    revision: AtomicU64,
}

impl ViewChannel {
    pub fn new(initial: ViewModel) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            revision: AtomicU64::new(0),
        }
    }

    /// Replaces the published view with `view()`. No subscriber yet is fine:
    /// the value is kept for the next one.
    pub fn publish(&self, view: impl FnOnce() -> ViewModel) {
        self.tx.send_modify(|current| {
            *current = view();
            self.revision.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.tx.subscribe()
    }

    /// Number of renders published so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }
}

impl Default for ViewChannel {
    fn default() -> Self {
        Self::new(ViewModel::default())
    }
}
