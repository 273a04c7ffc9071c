//! Short-lived directory listing cache.
//!
//! Entries are keyed by the canonical path string and served verbatim while younger than the
//! TTL. Mutations never invalidate entries: a listing may be stale for at most one TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::DirectoryEntry;

// Expired entries are swept once the map grows past this many keys
const PRUNE_THRESHOLD: usize = 256;

/// Time source for cache freshness and calendar views
pub trait Clock {
    /// Monotonic time used for TTL checks
    fn instant(&self) -> Instant;
    /// Wall-clock time used for calendar buckets
    fn utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn instant(&self) -> Instant {
        Instant::now()
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base_instant: Instant,
    base_utc: DateTime<Utc>,
    elapsed_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { base_instant: Instant::now(), base_utc: start, elapsed_ms: Arc::new(AtomicU64::new(0)) }
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms.fetch_add(millis, Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn instant(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn utc(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::zero());
        self.base_utc + elapsed
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub timestamp: Instant,
    pub entries: Vec<DirectoryEntry>,
}

/// TTL cache with staged writes.
///
/// Between [`begin_stage`](Self::begin_stage) and [`commit_stage`](Self::commit_stage) new
/// entries are held aside; [`discard_stage`](Self::discard_stage) drops them, so an aborted
/// command leaves the cache as it found it.
pub struct ListingCache {
    ttl: Duration,
    clock: Box<dyn Clock>,
    entries: HashMap<String, CacheEntry>,
    staged: Option<HashMap<String, CacheEntry>>,
}

impl ListingCache {
    pub fn new(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self { ttl, clock, entries: HashMap::new(), staged: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Fresh entries for `key`, staged writes first
    pub fn get(&self, key: &str) -> Option<Vec<DirectoryEntry>> {
        let now = self.clock.instant();
        let entry = self
            .staged
            .as_ref()
            .and_then(|staged| staged.get(key))
            .or_else(|| self.entries.get(key))?;

        if now.saturating_duration_since(entry.timestamp) < self.ttl {
            debug!(key, "listing cache hit");
            Some(entry.entries.clone())
        } else {
            debug!(key, "listing cache expired");
            None
        }
    }

    pub fn insert(&mut self, key: String, entries: Vec<DirectoryEntry>) {
        if self.ttl.is_zero() {
            return;
        }
        let entry = CacheEntry { timestamp: self.clock.instant(), entries };
        match self.staged.as_mut() {
            Some(staged) => {
                staged.insert(key, entry);
            }
            None => {
                self.entries.insert(key, entry);
                if self.entries.len() > PRUNE_THRESHOLD {
                    self.prune_expired();
                }
            }
        }
    }

    pub fn begin_stage(&mut self) {
        if self.staged.is_none() {
            self.staged = Some(HashMap::new());
        }
    }

    pub fn commit_stage(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.entries.extend(staged);
        }
    }

    pub fn discard_stage(&mut self) {
        if let Some(staged) = self.staged.take() {
            debug!(discarded = staged.len(), "discarding staged listing cache writes");
        }
    }

    /// Drop every entry. Not called by mutations; hosts use it after bulk changes.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        if let Some(staged) = self.staged.as_mut() {
            staged.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune_expired(&mut self) {
        let now = self.clock.instant();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now.saturating_duration_since(entry.timestamp) < ttl);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry(name: &str) -> DirectoryEntry {
        DirectoryEntry::directory(name, None)
    }

    fn cache_with_clock(ttl_ms: u64) -> (ListingCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let cache = ListingCache::new(Duration::from_millis(ttl_ms), Box::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_hit_within_ttl_and_miss_after() {
        let (mut cache, clock) = cache_with_clock(2000);
        cache.insert("/chats".to_string(), vec![entry("a")]);

        clock.advance(Duration::from_millis(1999));
        assert_eq!(cache.get("/chats").unwrap()[0].name, "a");

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("/chats").is_none());
    }

    #[test]
    fn test_zero_ttl_never_caches() {
        let (mut cache, _clock) = cache_with_clock(0);
        cache.insert("/".to_string(), vec![entry("a")]);
        assert!(cache.get("/").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_staged_writes_visible_then_committed() {
        let (mut cache, _clock) = cache_with_clock(2000);
        cache.begin_stage();
        cache.insert("/tags".to_string(), vec![entry("rust")]);
        assert!(cache.get("/tags").is_some());
        assert!(cache.is_empty());

        cache.commit_stage();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("/tags").is_some());
    }

    #[test]
    fn test_discarded_stage_leaves_cache_untouched() {
        let (mut cache, _clock) = cache_with_clock(2000);
        cache.insert("/".to_string(), vec![entry("chats")]);

        cache.begin_stage();
        cache.insert("/".to_string(), vec![entry("replaced")]);
        cache.insert("/tags".to_string(), vec![entry("rust")]);
        cache.discard_stage();

        assert_eq!(cache.get("/").unwrap()[0].name, "chats");
        assert!(cache.get("/tags").is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let (mut cache, _clock) = cache_with_clock(2000);
        cache.insert("/".to_string(), vec![entry("chats")]);
        cache.invalidate_all();
        assert!(cache.get("/").is_none());
    }

    #[test]
    fn test_manual_clock_moves_wall_time() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.utc(), start + chrono::Duration::seconds(90));
    }
}
