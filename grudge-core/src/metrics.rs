//! Runtime counters and save timings.
//!
//! Counters are lock-free `AtomicU64`s bumped on the hot path and read on
//! export. Save timings keep a small ring buffer behind a `parking_lot`
//! mutex; it is touched once per save, never per event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters owned by the [`StoreManager`](crate::manager::StoreManager).
pub struct GrudgeCounters {
    /// Combat events recorded.
    pub combat_events: AtomicU64,
    /// Social events recorded.
    pub social_events: AtomicU64,
    /// Environmental events recorded.
    pub environmental_events: AtomicU64,
    /// Payloads rejected by validation.
    pub validation_rejections: AtomicU64,
    /// Memory stores created from scratch.
    pub stores_created: AtomicU64,
    /// Memory stores deleted.
    pub stores_deleted: AtomicU64,
    /// Saves that reached storage.
    pub saves_completed: AtomicU64,
    /// Saves that failed.
    pub saves_failed: AtomicU64,
    /// Persisted entries skipped as corrupt on load.
    pub corrupt_entries_skipped: AtomicU64,
}

impl GrudgeCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            combat_events: AtomicU64::new(0),
            social_events: AtomicU64::new(0),
            environmental_events: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            stores_created: AtomicU64::new(0),
            stores_deleted: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            saves_failed: AtomicU64::new(0),
            corrupt_entries_skipped: AtomicU64::new(0),
        }
    }

    /// Add one to `counter`.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events: [
                self.combat_events.load(Ordering::Relaxed),
                self.social_events.load(Ordering::Relaxed),
                self.environmental_events.load(Ordering::Relaxed),
            ],
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            stores_created: self.stores_created.load(Ordering::Relaxed),
            stores_deleted: self.stores_deleted.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            saves_failed: self.saves_failed.load(Ordering::Relaxed),
            corrupt_entries_skipped: self.corrupt_entries_skipped.load(Ordering::Relaxed),
        }
    }
}

impl Default for GrudgeCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Events recorded by family [combat, social, environmental].
    pub events: [u64; 3],
    /// Rejected payloads.
    pub validation_rejections: u64,
    /// Stores created.
    pub stores_created: u64,
    /// Stores deleted.
    pub stores_deleted: u64,
    /// Successful saves.
    pub saves_completed: u64,
    /// Failed saves.
    pub saves_failed: u64,
    /// Corrupt entries skipped on load.
    pub corrupt_entries_skipped: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP grudge_events_total Events recorded by family\n\
             # TYPE grudge_events_total counter\n\
             grudge_events_total{{family=\"combat\"}} {}\n\
             grudge_events_total{{family=\"social\"}} {}\n\
             grudge_events_total{{family=\"environmental\"}} {}\n\
             # HELP grudge_validation_rejections_total Payloads rejected by validation\n\
             # TYPE grudge_validation_rejections_total counter\n\
             grudge_validation_rejections_total {}\n\
             # HELP grudge_stores_created_total Memory stores created\n\
             # TYPE grudge_stores_created_total counter\n\
             grudge_stores_created_total {}\n\
             # HELP grudge_stores_deleted_total Memory stores deleted\n\
             # TYPE grudge_stores_deleted_total counter\n\
             grudge_stores_deleted_total {}\n\
             # HELP grudge_saves_completed_total Save operations completed\n\
             # TYPE grudge_saves_completed_total counter\n\
             grudge_saves_completed_total {}\n\
             # HELP grudge_saves_failed_total Save operations failed\n\
             # TYPE grudge_saves_failed_total counter\n\
             grudge_saves_failed_total {}\n\
             # HELP grudge_corrupt_entries_skipped_total Persisted entries skipped as corrupt\n\
             # TYPE grudge_corrupt_entries_skipped_total counter\n\
             grudge_corrupt_entries_skipped_total {}\n",
            self.events[0],
            self.events[1],
            self.events[2],
            self.validation_rejections,
            self.stores_created,
            self.stores_deleted,
            self.saves_completed,
            self.saves_failed,
            self.corrupt_entries_skipped,
        )
    }
}

// ---------------------------------------------------------------------------
// Save timings
// ---------------------------------------------------------------------------

const SAVE_HISTORY: usize = 64;

/// Durations of recent saves.
pub struct SaveTimings {
    history: Mutex<SaveHistory>,
}

struct SaveHistory {
    micros: [u64; SAVE_HISTORY],
    write_idx: usize,
    count: u64,
}

impl SaveTimings {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: Mutex::new(SaveHistory {
                micros: [0; SAVE_HISTORY],
                write_idx: 0,
                count: 0,
            }),
        }
    }

    /// Record one save.
    pub fn record(&self, elapsed: Duration) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        h.micros[idx] = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        h.write_idx = (idx + 1) % SAVE_HISTORY;
        h.count += 1;
    }

    /// Total saves recorded.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.history.lock().count
    }

    /// Slowest save in the retained history, in microseconds.
    #[must_use]
    pub fn max_us(&self) -> u64 {
        self.history.lock().micros.iter().copied().max().unwrap_or(0)
    }

    /// Mean of the retained history, in microseconds.
    #[must_use]
    pub fn mean_us(&self) -> u64 {
        let h = self.history.lock();
        let n = usize::try_from(h.count).map_or(SAVE_HISTORY, |c| c.min(SAVE_HISTORY));
        if n == 0 {
            return 0;
        }
        h.micros[..n].iter().sum::<u64>() / n as u64
    }
}

impl Default for SaveTimings {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tracing span names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// Event ingestion.
    pub const RECORD: &str = "grudge::record";
    /// Persistence save.
    pub const PERSIST_SAVE: &str = "grudge::persist::save";
    /// Persistence load.
    pub const PERSIST_LOAD: &str = "grudge::persist::load";
}
