//! Audio output driver.
//!
//! The sync loop treats audio as a position source: it reads the audio
//! driver's current frame position to measure drift, and relocates the
//! driver when playback is not at normal speed. Position is published
//! through a cloneable [`AudioHandle`] backed by atomics, so the hot path
//! never takes a lock.
//!
//! [`AudioThread`] is the reference driver: it owns the playback thread and
//! advances its position one frame per frame-duration tick while running.
//! Real deployments replace it behind the same [`AudioClock`] seam.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::reader::ReaderInfo;
use crate::worker::Worker;

/// What the sync loop consumes from the audio side: a non-blocking position
/// read and an explicit relocation.
pub trait AudioClock: Send {
    /// Moves audio playback to `position`.
    fn seek(&self, position: i64);

    /// Current audio playback position in frame units.
    fn position(&self) -> i64;
}

/// Cloneable handle over the audio driver's shared state.
#[derive(Clone)]
pub struct AudioHandle {
    inner: Arc<AudioHandleInner>,
}

struct AudioHandleInner {
    /// Current playback position in frame units.
    position: AtomicI64,
    /// True while the driver thread is producing audio.
    active: AtomicBool,
}

impl AudioHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(AudioHandleInner {
                position: AtomicI64::new(0),
                active: AtomicBool::new(false),
            }),
        }
    }

    /// True while the driver thread is running.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }
}

impl AudioClock for AudioHandle {
    fn seek(&self, position: i64) {
        self.inner.position.store(position, Ordering::Relaxed);
    }

    fn position(&self) -> i64 {
        self.inner.position.load(Ordering::Relaxed)
    }
}

/// Reference audio output driver.
///
/// Owns one playback thread. While running, the thread advances the shared
/// position one frame per frame-duration tick, staying within
/// `[1, video_length]`. Seeks land as atomic stores; a racing tick reads the
/// relocated position on its next advance, which the engine tolerates as
/// eventually consistent.
pub struct AudioThread {
    handle: AudioHandle,
    worker: Option<Worker>,
}

impl AudioThread {
    pub fn new() -> Self {
        Self {
            handle: AudioHandle::new(),
            worker: None,
        }
    }

    /// Returns the cloneable position handle.
    pub fn handle(&self) -> AudioHandle {
        self.handle.clone()
    }

    /// Starts audio playback from `start_position`. No-op if already running.
    pub fn start(&mut self, start_position: i64, info: ReaderInfo) {
        if self.is_running() {
            return;
        }

        let tick = info.frame_duration();
        let length = info.video_length;
        let inner = Arc::clone(&self.handle.inner);
        inner.position.store(start_position.max(1), Ordering::Relaxed);
        inner.active.store(true, Ordering::Release);

        self.worker = Some(Worker::spawn("playhead-audio", move |stop| {
            tracing::debug!(start_position, "audio driver started");
            while !stop.load(Ordering::Acquire) {
                thread::sleep(tick);
                let position = inner.position.load(Ordering::Relaxed);
                if position < length {
                    inner.position.store(position + 1, Ordering::Relaxed);
                }
            }
            inner.active.store(false, Ordering::Release);
            tracing::debug!("audio driver stopped");
        }));
    }

    /// True while the playback thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(Worker::is_running)
    }

    /// Stops the playback thread, waiting at most `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        match self.worker.take() {
            Some(worker) => worker.stop_bounded(timeout),
            None => true,
        }
    }
}

impl Default for AudioThread {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(100));
    }
}
