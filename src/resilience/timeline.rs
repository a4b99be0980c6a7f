//! Per-route outcome timeline.
//!
//! # Responsibilities
//! - Count recent response classes (200 / 429 / 500 / 502) for one route
//! - Derive the failure ratio used by the admission gate
//!
//! # Design Decisions
//! - Fixed ring of time buckets, allocated once; rotation reuses the next
//!   slot and zeroes it
//! - Rotation is one compare-and-swap on a packed `(epoch tick, slot)` word,
//!   losers reread the winner's slot; no lock on the hot path
//! - An increment racing a rotation may be lost (bounded undercount)
//! - Only the current bucket is read; older buckets are never averaged

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Default bucket width in seconds.
pub const DEFAULT_BUCKET_SECS: u64 = 10;

/// Default number of buckets in the ring.
pub const DEFAULT_BUCKETS: usize = 12;

/// Largest ring the packed cursor can address.
pub const MAX_BUCKETS: usize = 1 << SLOT_BITS;

const SLOT_BITS: u32 = 16;
const SLOT_MASK: u64 = (1 << SLOT_BITS) - 1;
const TICK_MASK: u64 = u64::MAX >> SLOT_BITS;

/// Timeline sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    /// Width of one bucket in seconds.
    pub bucket_secs: u64,
    /// Number of buckets in the ring.
    pub buckets: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            bucket_secs: DEFAULT_BUCKET_SECS,
            buckets: DEFAULT_BUCKETS,
        }
    }
}

/// Response classes that take part in the failure ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200
    Ok,
    /// 429
    Throttled,
    /// 500
    ServerError,
    /// 502, also used for forwarding failures
    UpstreamError,
}

impl StatusClass {
    /// Map a status code to its class; any other code is not tracked.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => Some(StatusClass::Ok),
            429 => Some(StatusClass::Throttled),
            500 => Some(StatusClass::ServerError),
            502 => Some(StatusClass::UpstreamError),
            _ => None,
        }
    }
}

/// Counters read from the current bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutcomeSnapshot {
    pub ok: u32,
    pub throttled: u32,
    pub server_error: u32,
    pub upstream_error: u32,
}

impl OutcomeSnapshot {
    pub fn failures(&self) -> u64 {
        self.throttled as u64 + self.server_error as u64 + self.upstream_error as u64
    }

    pub fn total(&self) -> u64 {
        self.ok as u64 + self.failures()
    }

    /// `failures / (1 + total)`. The `+ 1` keeps an idle route at 0.
    pub fn ratio(&self) -> f64 {
        self.failures() as f64 / (1 + self.total()) as f64
    }
}

#[derive(Debug, Default)]
struct Bucket {
    epoch_key: AtomicI64,
    ok: AtomicU32,
    throttled: AtomicU32,
    server_error: AtomicU32,
    upstream_error: AtomicU32,
}

impl Bucket {
    fn reset(&self, epoch_key: i64) {
        self.ok.store(0, Ordering::Relaxed);
        self.throttled.store(0, Ordering::Relaxed);
        self.server_error.store(0, Ordering::Relaxed);
        self.upstream_error.store(0, Ordering::Relaxed);
        self.epoch_key.store(epoch_key, Ordering::Release);
    }

    fn counter(&self, class: StatusClass) -> &AtomicU32 {
        match class {
            StatusClass::Ok => &self.ok,
            StatusClass::Throttled => &self.throttled,
            StatusClass::ServerError => &self.server_error,
            StatusClass::UpstreamError => &self.upstream_error,
        }
    }

    fn load(&self) -> OutcomeSnapshot {
        OutcomeSnapshot {
            ok: self.ok.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            server_error: self.server_error.load(Ordering::Relaxed),
            upstream_error: self.upstream_error.load(Ordering::Relaxed),
        }
    }
}

/// Ring of time-bucketed status counters owned by one route leaf.
#[derive(Debug)]
pub struct OutcomeTracker {
    ring: Box<[Bucket]>,
    /// `(epoch tick << SLOT_BITS) | slot` of the current bucket.
    cursor: AtomicU64,
    bucket_secs: i64,
}

impl OutcomeTracker {
    /// Create a tracker whose first bucket covers the current epoch.
    pub fn new(config: TimelineConfig) -> Self {
        Self::starting_at(config, unix_now())
    }

    pub(crate) fn starting_at(config: TimelineConfig, now_secs: i64) -> Self {
        let buckets = config.buckets.clamp(1, MAX_BUCKETS);
        let bucket_secs = config.bucket_secs.max(1) as i64;
        let ring: Box<[Bucket]> = (0..buckets).map(|_| Bucket::default()).collect();

        let tick = now_secs.div_euclid(bucket_secs);
        ring[0].reset(tick * bucket_secs);

        Self {
            ring,
            cursor: AtomicU64::new(pack(tick, 0)),
            bucket_secs,
        }
    }

    /// Record a response status. Returns false for untracked codes.
    pub fn record(&self, status: u16) -> bool {
        self.record_at(status, unix_now())
    }

    pub fn record_class(&self, class: StatusClass) {
        self.record_class_at(class, unix_now());
    }

    /// Counters of the current bucket.
    pub fn snapshot(&self) -> OutcomeSnapshot {
        self.snapshot_at(unix_now())
    }

    pub fn ratio(&self) -> f64 {
        self.snapshot().ratio()
    }

    /// Number of slots in the ring.
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    pub(crate) fn record_at(&self, status: u16, now_secs: i64) -> bool {
        match StatusClass::from_status(status) {
            Some(class) => {
                self.record_class_at(class, now_secs);
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_class_at(&self, class: StatusClass, now_secs: i64) {
        self.current(now_secs)
            .counter(class)
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_at(&self, now_secs: i64) -> OutcomeSnapshot {
        self.current(now_secs).load()
    }

    pub(crate) fn current_slot(&self) -> usize {
        (self.cursor.load(Ordering::Acquire) & SLOT_MASK) as usize
    }

    pub(crate) fn current_epoch_key(&self) -> i64 {
        self.ring[self.current_slot()].epoch_key.load(Ordering::Acquire)
    }

    /// Current bucket, rotating by one slot if its epoch is stale.
    fn current(&self, now_secs: i64) -> &Bucket {
        let tick = now_secs.div_euclid(self.bucket_secs);
        let tick_bits = tick as u64 & TICK_MASK;
        let mut word = self.cursor.load(Ordering::Acquire);

        loop {
            let slot = (word & SLOT_MASK) as usize;
            if word >> SLOT_BITS == tick_bits {
                return &self.ring[slot];
            }

            let next = (slot + 1) % self.ring.len();
            match self.cursor.compare_exchange(
                word,
                pack(tick, next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let bucket = &self.ring[next];
                    bucket.reset(tick * self.bucket_secs);
                    return bucket;
                }
                Err(actual) => word = actual,
            }
        }
    }
}

fn pack(tick: i64, slot: usize) -> u64 {
    ((tick as u64 & TICK_MASK) << SLOT_BITS) | slot as u64
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
