//! Live-session counter.
//!
//! The status page reports how many browser sessions are currently open.
//! Every session increments the counter when its connection is accepted and
//! decrements it when the session ends, no matter how it ends.
//!
//! # Counting with a guard
//!
//! A session can end on many paths: the IRC server refuses the connection,
//! either side hangs up, an I/O error occurs.  [`SessionRegistry::increment`]
//! returns a [`SessionGuard`] that decrements when dropped, so the count
//! follows the guard's lifetime on every one of those paths.
//!
//! The registry is an ordinary value shared through `Arc`, not a global, so
//! tests can create as many independent registries as they like.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe count of open sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    live: AtomicUsize,
}

impl SessionRegistry {
    /// Creates a registry with no open sessions.
    pub fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
        }
    }

    /// Records a newly accepted session.
    ///
    /// The returned guard must be kept alive for as long as the session runs;
    /// dropping it records the session's end.
    pub fn increment(self: &Arc<Self>) -> SessionGuard {
        self.live.fetch_add(1, Ordering::AcqRel);
        SessionGuard {
            registry: Arc::clone(self),
        }
    }

    /// Returns the number of sessions currently open.
    ///
    /// The value is a snapshot; sessions on other tasks may open or close
    /// right after it is read.
    pub fn read(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    fn decrement(&self) {
        // Saturates at zero instead of wrapping to usize::MAX.
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// Proof that one session is counted in a [`SessionRegistry`].
///
/// Dropping the guard decrements the registry.
#[derive(Debug)]
#[must_use = "dropping the guard immediately uncounts the session"]
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.decrement();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
