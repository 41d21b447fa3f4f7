//! Frame pre-cache driver.
//!
//! The sync loop publishes the position it is about to display; the cache
//! driver watches that counter and warms the reader by requesting the next
//! few frames after it. Storage and eviction belong to the reader/cache
//! layer — this driver only generates the read-ahead demand.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::reader::FrameReader;
use crate::worker::Worker;

/// How many frames past the current position to warm.
const PREFETCH_AHEAD: i64 = 8;

/// Poll cadence for the prefetch thread.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What the sync loop consumes from the cache side: a position notification.
pub trait CacheNotifier: Send {
    /// Publishes the position the loop is about to display.
    fn set_current_position(&self, position: i64);
}

/// Cloneable notification handle given to the sync loop.
#[derive(Clone)]
pub struct CacheHandle {
    current: Arc<AtomicI64>,
}

impl CacheNotifier for CacheHandle {
    fn set_current_position(&self, position: i64) {
        self.current.store(position, Ordering::Relaxed);
    }
}

/// Reference pre-cache driver.
///
/// Owns the prefetch thread: whenever the published position moves, requests
/// the `PREFETCH_AHEAD` frames after it from the reader, absorbing reader
/// errors the same way retrieval does.
pub struct CacheThread {
    current: Arc<AtomicI64>,
    worker: Option<Worker>,
}

impl CacheThread {
    pub fn new() -> Self {
        Self {
            current: Arc::new(AtomicI64::new(0)),
            worker: None,
        }
    }

    /// Returns the notification handle for the sync loop.
    pub fn handle(&self) -> CacheHandle {
        CacheHandle {
            current: Arc::clone(&self.current),
        }
    }

    /// Starts the prefetch thread against `reader`. No-op if already running.
    pub fn start(&mut self, reader: Arc<dyn FrameReader>) {
        if self.is_running() {
            return;
        }

        let current = Arc::clone(&self.current);
        let length = reader.info().video_length;

        self.worker = Some(Worker::spawn("playhead-cache", move |stop| {
            tracing::debug!("cache driver started");
            let mut last_warmed = i64::MIN;
            while !stop.load(Ordering::Acquire) {
                let position = current.load(Ordering::Relaxed);
                if position != last_warmed {
                    for offset in 1..=PREFETCH_AHEAD {
                        if stop.load(Ordering::Acquire) {
                            break;
                        }
                        let target = position + offset;
                        if target < 1 || target > length {
                            continue;
                        }
                        // Warming only; a closed or out-of-range reader is
                        // the retrieval path's problem, not ours.
                        let _ = reader.get_frame(target);
                    }
                    last_warmed = position;
                }
                thread::sleep(POLL_INTERVAL);
            }
            tracing::debug!("cache driver stopped");
        }));
    }

    /// True while the prefetch thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(Worker::is_running)
    }

    /// Stops the prefetch thread, waiting at most `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        match self.worker.take() {
            Some(worker) => worker.stop_bounded(timeout),
            None => true,
        }
    }
}

impl Default for CacheThread {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CacheThread {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(100));
    }
}
