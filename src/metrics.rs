//! Process-wide counters for handshakes and type-reference dispatch.

use std::sync::atomic::{AtomicU64, Ordering};

/// Track modlink counters without external dependencies.
pub(crate) struct Metrics;

static HANDSHAKES_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static HANDSHAKES_REJECTED: AtomicU64 = AtomicU64::new(0);
static EMPTY_MANIFESTS: AtomicU64 = AtomicU64::new(0);
static ASSIGNMENTS_ADOPTED: AtomicU64 = AtomicU64::new(0);
static NATIVE_WRITTEN: AtomicU64 = AtomicU64::new(0);
static NATIVE_READ: AtomicU64 = AtomicU64::new(0);
static CUSTOM_WRITTEN: AtomicU64 = AtomicU64::new(0);
static CUSTOM_READ: AtomicU64 = AtomicU64::new(0);

/// Which side of the dispatch hook saw a type reference.
#[derive(Clone, Copy)]
pub(crate) enum Direction {
    Written,
    Read,
}

impl Metrics {
    #[inline]
    pub(crate) fn record_verdict(accepted: bool) {
        if accepted {
            HANDSHAKES_ACCEPTED.fetch_add(1, Ordering::Relaxed);
        } else {
            HANDSHAKES_REJECTED.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_empty_manifest() {
        EMPTY_MANIFESTS.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_adoption() {
        ASSIGNMENTS_ADOPTED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_type_reference(direction: Direction, custom: bool) {
        let counter = match (direction, custom) {
            (Direction::Written, false) => &NATIVE_WRITTEN,
            (Direction::Read, false) => &NATIVE_READ,
            (Direction::Written, true) => &CUSTOM_WRITTEN,
            (Direction::Read, true) => &CUSTOM_READ,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Current values of all counters.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        handshakes_accepted: HANDSHAKES_ACCEPTED.load(Ordering::Relaxed),
        handshakes_rejected: HANDSHAKES_REJECTED.load(Ordering::Relaxed),
        empty_manifests: EMPTY_MANIFESTS.load(Ordering::Relaxed),
        assignments_adopted: ASSIGNMENTS_ADOPTED.load(Ordering::Relaxed),
        native_written: NATIVE_WRITTEN.load(Ordering::Relaxed),
        native_read: NATIVE_READ.load(Ordering::Relaxed),
        custom_written: CUSTOM_WRITTEN.load(Ordering::Relaxed),
        custom_read: CUSTOM_READ.load(Ordering::Relaxed),
    }
}

/// Lightweight snapshot of the counters.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Handshakes that ended accepted
    pub handshakes_accepted: u64,
    /// Handshakes that ended rejected
    pub handshakes_rejected: u64,
    /// Peer manifests decoded as empty
    pub empty_manifests: u64,
    /// Peer assignments adopted
    pub assignments_adopted: u64,
    /// Native type references written
    pub native_written: u64,
    /// Native type references read
    pub native_read: u64,
    /// Custom type references written
    pub custom_written: u64,
    /// Custom type references read
    pub custom_read: u64,
}

impl MetricsSnapshot {
    /// Total type references seen by the dispatch hook.
    #[must_use]
    pub fn type_references(&self) -> u64 {
        self.native_written + self.native_read + self.custom_written + self.custom_read
    }

    /// Fraction of handshakes rejected, if any were validated.
    #[must_use]
    pub fn rejection_rate(&self) -> Option<f64> {
        let total = self.handshakes_accepted + self.handshakes_rejected;
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.handshakes_rejected as f64 / total as f64)
    }
}
