//! HierarchyCache: the current index, rebuilt from the metadata source once
//! it is older than the refresh interval.
//!
//! Readers always get a complete `Arc<HierarchyIndex>`. A failed rebuild
//! leaves the previous index in place. One caller rebuilds at a time; the
//! others keep reading the current index meanwhile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use terraview_core::config::HierarchyConfig;
use terraview_core::errors::{EntitlementResult, StorageError};
use terraview_core::traits::{Clock, IMetadataSource};

use super::HierarchyIndex;

struct Snapshot {
    index: Arc<HierarchyIndex>,
    built_at: DateTime<Utc>,
}

pub struct HierarchyCache {
    source: Arc<dyn IMetadataSource>,
    clock: Arc<dyn Clock>,
    state: String,
    refresh_interval: Duration,
    current: RwLock<Snapshot>,
    refreshing: AtomicBool,
}

impl HierarchyCache {
    /// Build the first index. Fails if the source cannot be read.
    pub fn load(
        source: Arc<dyn IMetadataSource>,
        config: &HierarchyConfig,
        clock: Arc<dyn Clock>,
    ) -> EntitlementResult<Self> {
        let state = config.default_state.clone();
        let index = Arc::new(HierarchyIndex::build(source.fetch_entries(&state)?));
        info!(
            state = %state,
            districts = index.district_count(),
            villages = index.village_count(),
            "hierarchy index built"
        );
        let built_at = clock.now();
        Ok(Self {
            source,
            clock,
            state,
            refresh_interval: Duration::seconds(
                i64::try_from(config.refresh_interval_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
            current: RwLock::new(Snapshot { index, built_at }),
            refreshing: AtomicBool::new(false),
        })
    }

    /// The current index, rebuilt first if it has gone stale and no other
    /// caller is already rebuilding it.
    pub fn index(&self) -> Arc<HierarchyIndex> {
        if self.is_stale()
            && self
                .refreshing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            // Another caller may have finished a rebuild since the first check.
            if self.is_stale() {
                if let Err(e) = self.refresh() {
                    warn!(error = %e, state = %self.state, "hierarchy refresh failed, keeping previous index");
                }
            }
            self.refreshing.store(false, Ordering::Release);
        }
        self.snapshot()
    }

    /// The current index without a staleness check.
    pub fn snapshot(&self) -> Arc<HierarchyIndex> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard.index),
            Err(poisoned) => Arc::clone(&poisoned.into_inner().index),
        }
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        match self.current.read() {
            Ok(guard) => guard.built_at,
            Err(poisoned) => poisoned.into_inner().built_at,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.clock.now() - self.built_at() >= self.refresh_interval
    }

    /// Rebuild from the source now. Returns the number of villages indexed.
    pub fn refresh(&self) -> EntitlementResult<usize> {
        let entries = self.source.fetch_entries(&self.state)?;
        let index = Arc::new(HierarchyIndex::build(entries));
        let villages = index.village_count();
        let built_at = self.clock.now();

        let mut guard = self
            .current
            .write()
            .map_err(|e| StorageError::LockPoisoned(format!("hierarchy cache: {e}")))?;
        *guard = Snapshot { index, built_at };
        drop(guard);

        info!(state = %self.state, villages, "hierarchy index rebuilt");
        Ok(villages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    use chrono::TimeZone;
    use terraview_core::errors::EntitlementError;
    use terraview_core::models::HierarchyEntry;
    use terraview_core::traits::FixedClock;

    struct FlakySource {
        rows: Mutex<Vec<HierarchyEntry>>,
        fail: AtomicBool,
        fetches: AtomicUsize,
        delay: std::time::Duration,
    }

    impl IMetadataSource for FlakySource {
        fn fetch_entries(&self, _state: &str) -> EntitlementResult<Vec<HierarchyEntry>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.fail.load(Ordering::SeqCst) {
                return Err(EntitlementError::Storage(StorageError::SqliteError {
                    message: "replica unavailable".into(),
                }));
            }
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    fn entry(village_code: &str, village: &str) -> HierarchyEntry {
        HierarchyEntry {
            state: "maharashtra".into(),
            district_code: "19".into(),
            district_name: "Jalgaon".into(),
            taluka_code: "1901".into(),
            taluka_name: "Parola".into(),
            village_code: village_code.into(),
            village_name: village.into(),
        }
    }

    fn setup() -> (Arc<FlakySource>, Arc<FixedClock>, HierarchyCache) {
        setup_with_delay(std::time::Duration::ZERO)
    }

    fn setup_with_delay(
        delay: std::time::Duration,
    ) -> (Arc<FlakySource>, Arc<FixedClock>, HierarchyCache) {
        let source = Arc::new(FlakySource {
            rows: Mutex::new(vec![entry("190102", "Mohadi")]),
            fail: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            delay,
        });
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let config = HierarchyConfig {
            refresh_interval_secs: 60,
            ..Default::default()
        };
        let cache = HierarchyCache::load(source.clone(), &config, clock.clone()).unwrap();
        (source, clock, cache)
    }

    #[test]
    fn fresh_index_is_not_rebuilt() {
        let (source, _clock, cache) = setup();
        source.rows.lock().unwrap().push(entry("190101", "Anturli"));
        assert_eq!(cache.index().village_count(), 1);
    }

    #[test]
    fn stale_index_is_rebuilt() {
        let (source, clock, cache) = setup();
        source.rows.lock().unwrap().push(entry("190101", "Anturli"));
        clock.advance(Duration::seconds(61));
        assert_eq!(cache.index().village_count(), 2);
        assert!(!cache.is_stale());
    }

    #[test]
    fn failed_rebuild_keeps_previous_index() {
        let (source, clock, cache) = setup();
        source.fail.store(true, Ordering::SeqCst);
        clock.advance(Duration::seconds(61));
        assert_eq!(cache.index().village_count(), 1);
        assert!(cache.is_stale());
    }

    #[test]
    fn concurrent_stale_readers_rebuild_once() {
        let (source, clock, cache) = setup_with_delay(std::time::Duration::from_millis(100));
        let cache = Arc::new(cache);
        source.rows.lock().unwrap().push(entry("190101", "Anturli"));
        clock.advance(Duration::seconds(61));
        let before = source.fetches.load(Ordering::SeqCst);

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.index().village_count()
                })
            })
            .collect();
        for handle in handles {
            let villages = handle.join().unwrap();
            assert!(villages == 1 || villages == 2);
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst) - before, 1);
        assert_eq!(cache.index().village_count(), 2);
    }
}
