//! Dispatch counters, compiled in with the `perf-counters` feature.
//!
//! Every top-level scan bumps one path counter and one size bucket, which is
//! enough to see how much traffic is too short for the vector path or never
//! reaches it because a policy is installed. Counters are process-global and
//! use relaxed atomics; a snapshot taken while scans run is not a consistent
//! cut.

use std::sync::atomic::{AtomicU64, Ordering};

/// Size buckets: `<= 8` units, then one per power of two up to 512, then the rest.
pub const SIZE_BUCKETS: usize = 8;

/// Which path served a scan call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPath {
    Scalar,
    Vector,
    Policy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub calls: u64,
    pub units: u64,
    pub scalar_calls: u64,
    pub vector_calls: u64,
    pub policy_calls: u64,
    pub buckets: [u64; SIZE_BUCKETS],
}

struct Counters {
    units: AtomicU64,
    by_path: [AtomicU64; 3],
    by_size: [AtomicU64; SIZE_BUCKETS],
}

static COUNTERS: Counters = Counters {
    units: AtomicU64::new(0),
    by_path: [const { AtomicU64::new(0) }; 3],
    by_size: [const { AtomicU64::new(0) }; SIZE_BUCKETS],
};

impl ScanPath {
    fn slot(self) -> usize {
        match self {
            ScanPath::Scalar => 0,
            ScanPath::Vector => 1,
            ScanPath::Policy => 2,
        }
    }
}

fn size_bucket(units: usize) -> usize {
    if units <= 8 {
        return 0;
    }
    // ceil(log2(units)) is 4 for 9..=16, so subtract 3.
    let ceil_log2 = (usize::BITS - (units - 1).leading_zeros()) as usize;
    (ceil_log2 - 3).min(SIZE_BUCKETS - 1)
}

#[inline]
pub fn record_scan(units: usize, path: ScanPath) {
    COUNTERS.units.fetch_add(units as u64, Ordering::Relaxed);
    COUNTERS.by_path[path.slot()].fetch_add(1, Ordering::Relaxed);
    COUNTERS.by_size[size_bucket(units)].fetch_add(1, Ordering::Relaxed);
}

pub fn reset() {
    let all = std::iter::once(&COUNTERS.units)
        .chain(&COUNTERS.by_path)
        .chain(&COUNTERS.by_size);
    for counter in all {
        counter.store(0, Ordering::Relaxed);
    }
}

pub fn snapshot() -> ScanStats {
    let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
    let [scalar_calls, vector_calls, policy_calls] = COUNTERS.by_path.each_ref().map(load);
    ScanStats {
        calls: scalar_calls + vector_calls + policy_calls,
        units: load(&COUNTERS.units),
        scalar_calls,
        vector_calls,
        policy_calls,
        buckets: COUNTERS.by_size.each_ref().map(load),
    }
}
