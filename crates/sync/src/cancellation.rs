//! Cooperative cancellation for the service entry points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag checked between items in `get_items`/`save_items`. Already
/// persisted writes are never rolled back on cancellation; the loop simply
/// stops issuing new work.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that starts, and stays, uncancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
