//! # Cooperative Cancellation
//!
//! Every top-level engine operation accepts a [`CancellationToken`]. Bitset
//! operations are CPU-bound and are not preemptively interrupted; instead,
//! long-running loops (the cache engine's dirty-set drain, the leaderboard
//! evaluator's per-node fan-out) check the token between atoms, the same
//! polling-flag idiom the teacher uses for `scheduling::worker::Worker`'s
//! `is_running: Arc<AtomicBool>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::{EngineError, Result};

/// A cooperative cancellation handle, cheap to clone and share across
/// workers.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the token cancelled and wake anyone waiting on it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` if cancellation has been requested, else
    /// `Ok(())`. Intended to be called between atoms of a long-running
    /// operation.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}
