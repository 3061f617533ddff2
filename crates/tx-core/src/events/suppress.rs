//! Duplicate filter-change suppression
//!
//! The platform fires the same filter-changed event several times for a single
//! user action. Equal events seen within [`DUPLICATE_WINDOW`] of each other are
//! dropped. The window is a heuristic, not a platform guarantee.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{EventCallback, TypedEvent};

/// How long an event is remembered
pub const DUPLICATE_WINDOW: Duration = Duration::from_millis(500);

/// Last-seen timestamps keyed by event value
#[derive(Debug)]
pub struct DedupCache<K> {
    seen: AHashMap<K, Instant>,
    window: Duration,
}

impl<K: Hash + Eq> DedupCache<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: AHashMap::new(),
            window,
        }
    }

    /// Returns true when `key` should be delivered.
    ///
    /// Stale entries are evicted before the check, so an event older than the
    /// window never blocks a new one.
    pub fn admit(&mut self, key: K, now: Instant) -> bool {
        let window = self.window;
        self.seen
            .retain(|_, seen| now.saturating_duration_since(*seen) <= window);

        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<K: Hash + Eq> Default for DedupCache<K> {
    fn default() -> Self {
        Self::new(DUPLICATE_WINDOW)
    }
}

/// Wrap `inner` so repeated equal events within the window reach it once
pub fn suppress_duplicates(inner: EventCallback) -> EventCallback {
    let cache = Mutex::new(DedupCache::<String>::default());
    Arc::new(move |event: &TypedEvent| {
        let key = event.dedup_key();
        let admitted = cache.lock().admit(key, Instant::now());
        if admitted {
            inner(event)
        } else {
            tracing::debug!("Suppressed duplicate {} event for '{}'", event.kind(), event.dedup_key());
            Ok(())
        }
    })
}
