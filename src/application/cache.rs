//! Whole-page memo for the global feed.
//!
//! A single-entry cache holding the rendered byte output of the unfiltered
//! first page of the global feed. There is no TTL and no eviction policy:
//! writers do not touch it, so a read after a post write may serve stale
//! bytes until `invalidate` is called. Cache/store consistency is advisory,
//! not transactional.

use std::sync::RwLock;

use bytes::Bytes;
use metrics::counter;
use tracing::warn;

const SOURCE: &str = "application::cache";

pub struct FeedPageCache {
    enabled: bool,
    slot: RwLock<Option<Bytes>>,
}

impl FeedPageCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }
        let cached = self.read_slot().clone();
        match &cached {
            Some(_) => counter!("brusio_feed_cache_hit_total").increment(1),
            None => counter!("brusio_feed_cache_miss_total").increment(1),
        }
        cached
    }

    pub fn set(&self, rendered: Bytes) {
        if !self.enabled {
            return;
        }
        *self.write_slot() = Some(rendered);
    }

    /// Drop the memo unconditionally. The next read repopulates it from the
    /// current store state.
    pub fn invalidate(&self) {
        *self.write_slot() = None;
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Option<Bytes>> {
        self.slot.read().unwrap_or_else(|poisoned| {
            warn!(target = SOURCE, "feed cache lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn write_slot(&self) -> std::sync::RwLockWriteGuard<'_, Option<Bytes>> {
        self.slot.write().unwrap_or_else(|poisoned| {
            warn!(target = SOURCE, "feed cache lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
