//! Cooperative cancellation for blocking transport waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::TransportError;

/// A shared flag a transport checks at its blocking point.
///
/// Clones share the flag: cancelling any clone cancels them all.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any wait observing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), TransportError> {
        if self.is_cancelled() {
            Err(TransportError::Cancelled)
        } else {
            Ok(())
        }
    }
}
