//! Backend pool with liveness-aware round-robin selection.
//!
//! # Responsibilities
//! - Hold the ordered backend set as an immutable snapshot
//! - Rotate a monotonic cursor across live backends
//! - Expose liveness mutation by address
//!
//! # Design Decisions
//! - The backend sequence lives behind an `ArcSwap` snapshot. `add` clones
//!   the current vector, pushes, and swaps the whole snapshot in, so a
//!   concurrent `select` never observes a partially-appended sequence.
//! - The cursor is a bare `AtomicU64`; each `select` sees a distinct
//!   post-increment value. When the scan lands past the starting index the
//!   found index is written back so dead backends are not re-scanned on
//!   every call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use url::Url;

use crate::load_balancer::backend::Backend;

/// Ordered set of backends plus the rotation cursor.
#[derive(Debug, Default)]
pub struct BackendPool {
    backends: ArcSwap<Vec<Arc<Backend>>>,
    cursor: AtomicU64,
}

impl BackendPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend. Copy-on-write: readers keep their snapshot.
    pub fn add(&self, backend: Arc<Backend>) {
        let current = self.backends.load();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(backend);
        self.backends.store(Arc::new(next));
    }

    /// Select the next live backend, or `None` when no backend is live.
    ///
    /// Advances the cursor by one, then scans forward at most one full
    /// cycle for a live backend.
    pub fn select(&self) -> Option<Arc<Backend>> {
        let backends = self.backends.load();
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let start = (self.cursor.fetch_add(1, Ordering::Relaxed) as usize) % len;
        for i in 0..len {
            let idx = (start + i) % len;
            if backends[idx].is_alive() {
                if idx != start {
                    // Skip-ahead: park the cursor on the live backend.
                    self.cursor.store(idx as u64, Ordering::Relaxed);
                }
                return Some(backends[idx].clone());
            }
        }
        None
    }

    /// Set the liveness flag of the backend with the given URL.
    pub fn mark_status(&self, url: &Url, alive: bool) {
        let backends = self.backends.load();
        if let Some(backend) = backends.iter().find(|b| b.url == *url) {
            backend.set_alive(alive);
        }
    }

    /// Snapshot of every backend, for health checking.
    pub fn all_backends(&self) -> Vec<Arc<Backend>> {
        self.backends.load().as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.backends.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
