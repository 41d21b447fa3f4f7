//! A/V synchronization metrics.
//!
//! Lock-free instrumentation for the playback loop: every display iteration
//! records its drift measurement and timing, and consumers pull a
//! [`SyncSnapshot`] whenever they want a report. Units are whole frames
//! (positive drift = video ahead of audio), matching what the loop measures.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Absolute drift at or beyond this many frames counts as out of sync.
/// A couple of frames is imperceptible; ten is a visible lip-sync error.
pub const DRIFT_THRESHOLD_FRAMES: i64 = 10;

/// A/V sync metrics recorder.
///
/// Cloneable handle over atomics; safe to record from the playback loop
/// while other threads snapshot.
#[derive(Clone)]
pub struct SyncMetrics {
    inner: Arc<SyncMetricsInner>,
}

struct SyncMetricsInner {
    /// Most recent drift in frames.
    current_drift: AtomicI64,
    /// Largest positive drift seen (video ahead).
    max_drift_ahead: AtomicI64,
    /// Largest-magnitude negative drift seen (video behind).
    max_drift_behind: AtomicI64,
    /// Sum of |drift| for averaging.
    total_abs_drift: AtomicU64,
    /// Iterations recorded.
    samples: AtomicU64,
    /// Iterations with |drift| >= DRIFT_THRESHOLD_FRAMES.
    out_of_sync: AtomicU64,
    /// Catch-up jumps taken.
    catch_up_jumps: AtomicU64,
    /// Total frames skipped by catch-up jumps.
    frames_skipped: AtomicU64,
    /// Frames handed to the video driver.
    frames_presented: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SyncMetricsInner {
                current_drift: AtomicI64::new(0),
                max_drift_ahead: AtomicI64::new(0),
                max_drift_behind: AtomicI64::new(0),
                total_abs_drift: AtomicU64::new(0),
                samples: AtomicU64::new(0),
                out_of_sync: AtomicU64::new(0),
                catch_up_jumps: AtomicU64::new(0),
                frames_skipped: AtomicU64::new(0),
                frames_presented: AtomicU64::new(0),
            }),
        }
    }

    /// Records one display iteration's drift measurement.
    pub fn record_drift(&self, drift: i64) {
        let inner = &self.inner;
        inner.current_drift.store(drift, Ordering::Relaxed);
        inner.max_drift_ahead.fetch_max(drift, Ordering::Relaxed);
        inner.max_drift_behind.fetch_min(drift, Ordering::Relaxed);
        inner
            .total_abs_drift
            .fetch_add(drift.unsigned_abs(), Ordering::Relaxed);
        inner.samples.fetch_add(1, Ordering::Relaxed);
        if drift.abs() >= DRIFT_THRESHOLD_FRAMES {
            inner.out_of_sync.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a catch-up jump of `frames` frames.
    pub fn record_catch_up(&self, frames: i64) {
        self.inner.catch_up_jumps.fetch_add(1, Ordering::Relaxed);
        self.inner
            .frames_skipped
            .fetch_add(frames.unsigned_abs(), Ordering::Relaxed);
    }

    /// Records a frame handed to the video driver.
    pub fn record_presented(&self) {
        self.inner.frames_presented.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of the counters.
    pub fn snapshot(&self) -> SyncSnapshot {
        let inner = &self.inner;
        SyncSnapshot {
            current_drift: inner.current_drift.load(Ordering::Relaxed),
            max_drift_ahead: inner.max_drift_ahead.load(Ordering::Relaxed),
            max_drift_behind: inner.max_drift_behind.load(Ordering::Relaxed),
            total_abs_drift: inner.total_abs_drift.load(Ordering::Relaxed),
            samples: inner.samples.load(Ordering::Relaxed),
            out_of_sync: inner.out_of_sync.load(Ordering::Relaxed),
            catch_up_jumps: inner.catch_up_jumps.load(Ordering::Relaxed),
            frames_skipped: inner.frames_skipped.load(Ordering::Relaxed),
            frames_presented: inner.frames_presented.load(Ordering::Relaxed),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the sync counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub current_drift: i64,
    pub max_drift_ahead: i64,
    pub max_drift_behind: i64,
    pub total_abs_drift: u64,
    pub samples: u64,
    pub out_of_sync: u64,
    pub catch_up_jumps: u64,
    pub frames_skipped: u64,
    pub frames_presented: u64,
}

impl SyncSnapshot {
    /// Average |drift| in frames across all samples.
    pub fn average_abs_drift(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_abs_drift as f64 / self.samples as f64
        }
    }

    /// True if no recorded iteration was out of sync.
    pub fn passed_sync_test(&self) -> bool {
        self.out_of_sync == 0
    }
}
