//! Cooperative cancellation
//!
//! An `AbortHandle` owns a generation counter. Each run snapshots the
//! generation into a `CancellationToken` when it starts; bumping the counter
//! cancels every token taken before the bump and none taken after it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared abort switch
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    generation: Arc<AtomicU64>,
}

impl AbortHandle {
    /// Create a handle with no pending abort
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every token issued so far
    pub fn abort(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Token for a run starting now
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            generation: Arc::clone(&self.generation),
            armed_at: self.generation.load(Ordering::SeqCst),
        }
    }
}

/// Per-run view of an `AbortHandle`
#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: Arc<AtomicU64>,
    armed_at: u64,
}

impl CancellationToken {
    /// Token that is never cancelled
    pub fn never() -> Self {
        AbortHandle::new().token()
    }

    /// Whether an abort was requested after this token was issued
    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.armed_at
    }
}
