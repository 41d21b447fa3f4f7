//! Playback controller and lifecycle manager.
//!
//! One dedicated thread runs the synchronization loop: fetch the next frame,
//! hand it to the video driver, measure how far the video position has
//! drifted from the audio driver's position, then sleep out the remainder of
//! the frame budget adjusted for that drift. The three peer drivers (audio,
//! video, pre-cache) are owned by [`PlayerController`] for their full
//! lifetime; the loop coordinates with them only through position counters
//! and the single-slot render hand-off, so the hot path takes no locks.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{AudioClock, AudioThread};
use crate::cache::{CacheNotifier, CacheThread};
use crate::reader::{Frame, FrameReader, ReaderError, ReaderInfo};
use crate::sync::{plan_iteration, DEFAULT_MAX_SLEEP};
use crate::sync_metrics::SyncMetrics;
use crate::video::{Renderer, VideoSink, VideoThread};
use crate::worker::Worker;

/// Counters shared between the controller surface and the sync loop.
///
/// The loop owns writes to `video_position` during normal stepping; callers
/// write it only through explicit seeks. Racy reads are tolerated — a stale
/// value yields a slightly stale drift measurement, corrected next
/// iteration.
pub(crate) struct PlaybackShared {
    video_position: AtomicI64,
    speed: AtomicI64,
}

impl PlaybackShared {
    fn new() -> Self {
        Self {
            video_position: AtomicI64::new(1),
            speed: AtomicI64::new(1),
        }
    }

    pub(crate) fn video_position(&self) -> i64 {
        self.video_position.load(Ordering::Relaxed)
    }

    pub(crate) fn set_video_position(&self, position: i64) {
        self.video_position.store(position, Ordering::Relaxed);
    }

    pub(crate) fn speed(&self) -> i64 {
        self.speed.load(Ordering::Relaxed)
    }

    pub(crate) fn set_speed(&self, speed: i64) {
        self.speed.store(speed, Ordering::Relaxed);
    }

    fn advance(&self, frames: i64) {
        self.video_position.fetch_add(frames, Ordering::Relaxed);
    }
}

/// The loop's three peer seams, bundled so fakes drop in for tests.
pub(crate) struct LoopDrivers<A, V, C> {
    pub audio: A,
    pub video: V,
    pub cache: C,
}

/// Decides the frame to display this iteration.
///
/// Tentatively advances the position by the current speed (the sole advance
/// site under normal play), reuses the previously fetched frame during a
/// paused hold, and otherwise notifies the pre-cache driver and fetches from
/// the reader. `Closed` and `OutOfBounds` are absorbed into a no-frame
/// iteration; the loop's pause detection idles safely on those.
fn next_frame<C: CacheNotifier>(
    reader: &Arc<dyn FrameReader>,
    info: &ReaderInfo,
    shared: &PlaybackShared,
    last_video_position: i64,
    current: Option<Frame>,
    cache: &C,
) -> Option<Frame> {
    let speed = shared.speed();
    let position = shared.video_position();

    let next = position + speed;
    let position = if next >= 1 && next <= info.video_length {
        shared.set_video_position(next);
        next
    } else {
        position
    };

    if let Some(frame) = &current {
        if frame.number == position && position == last_video_position {
            // Paused hold: nothing moved since the last display.
            return current;
        }
    }

    cache.set_current_position(position);
    match reader.get_frame(position) {
        Ok(frame) => Some(frame),
        Err(error @ (ReaderError::Closed | ReaderError::OutOfBounds(_))) => {
            tracing::trace!(position, %error, "no frame this iteration");
            None
        }
    }
}

/// The synchronization loop. Runs on its own thread until `stop` is raised;
/// the flag is only checked at the top of an iteration, so an iteration
/// always completes once started.
pub(crate) fn playback_loop<A, V, C>(
    reader: Arc<dyn FrameReader>,
    shared: Arc<PlaybackShared>,
    drivers: LoopDrivers<A, V, C>,
    metrics: SyncMetrics,
    max_sleep: Duration,
    stop: Arc<AtomicBool>,
) where
    A: AudioClock,
    V: VideoSink,
    C: CacheNotifier,
{
    let info = reader.info();
    let frame_duration = info.frame_duration();
    let av_active = info.has_audio && info.has_video;

    let mut last_video_position = shared.video_position();
    let mut current: Option<Frame> = None;

    while !stop.load(Ordering::Acquire) {
        let render_started = Instant::now();

        current = next_frame(
            &reader,
            &info,
            &shared,
            last_video_position,
            current.take(),
            &drivers.cache,
        );
        let video_position = shared.video_position();
        let speed = shared.speed();

        // Pause / end-of-source steady state: hold one frame budget without
        // rendering or advancing.
        if (speed == 0 && video_position == last_video_position)
            || video_position > info.video_length
        {
            shared.set_speed(0);
            thread::sleep(frame_duration);
            continue;
        }

        if let Some(frame) = &current {
            drivers.video.present(frame.clone());
            metrics.record_presented();
        }
        last_video_position = video_position;

        // Drift is only meaningful when the source carries both streams.
        let mut drift = 0;
        let mut audio_position = 0;
        if av_active {
            if speed != 1 {
                // Off normal speed there is no continuous audio stream to
                // track; relocate audio to the displayed position instead.
                drivers.audio.seek(video_position);
            }
            audio_position = drivers.audio.position();
            drift = video_position - audio_position;
        }

        let render_time = render_started.elapsed();
        let plan = plan_iteration(frame_duration, render_time, drift, av_active, max_sleep);

        tracing::debug!(
            video_frame_diff = drift,
            video_position,
            audio_position,
            speed,
            render_time_ms = render_time.as_secs_f64() * 1000.0,
            sleep_time_ms = plan.sleep_ms,
            "determine sleep"
        );
        metrics.record_drift(drift);

        if plan.skip_forward > 0 {
            shared.advance(plan.skip_forward);
            metrics.record_catch_up(plan.skip_forward);
        }
        if let Some(sleep) = plan.sleep {
            thread::sleep(sleep);
        }
    }
}

/// Owns the playback session: the reader handle, the three output drivers,
/// the shared counters, and the sync loop thread.
///
/// Dropping the controller stops playback.
pub struct PlayerController {
    reader: Option<Arc<dyn FrameReader>>,
    shared: Arc<PlaybackShared>,
    metrics: SyncMetrics,
    audio: AudioThread,
    video: VideoThread,
    cache: CacheThread,
    loop_worker: Option<Worker>,
    max_sleep: Duration,
}

impl PlayerController {
    /// Creates a controller rendering through `renderer`. All three drivers
    /// are created here and live until the controller is dropped.
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            reader: None,
            shared: Arc::new(PlaybackShared::new()),
            metrics: SyncMetrics::new(),
            audio: AudioThread::new(),
            video: VideoThread::new(renderer),
            cache: CacheThread::new(),
            loop_worker: None,
            max_sleep: DEFAULT_MAX_SLEEP,
        }
    }

    /// Attaches the frame source. Takes effect on the next `start_playback`.
    pub fn set_reader(&mut self, reader: Arc<dyn FrameReader>) {
        self.reader = Some(reader);
    }

    /// Overrides the hard ceiling on a single sleep and on each driver-stop
    /// wait.
    pub fn set_max_sleep(&mut self, max_sleep: Duration) {
        self.max_sleep = max_sleep;
    }

    /// Current playback speed (0 = paused, 1 = normal, negative = reverse).
    pub fn speed(&self) -> i64 {
        self.shared.speed()
    }

    /// Sets the playback speed.
    pub fn set_speed(&self, speed: i64) {
        self.shared.set_speed(speed);
    }

    /// Current video position (1-based frame number).
    pub fn position(&self) -> i64 {
        self.shared.video_position()
    }

    /// Moves the video position. Audio follows through the loop's
    /// drift-correction path.
    pub fn seek(&self, position: i64) {
        self.shared.set_video_position(position);
    }

    /// True while the sync loop is running.
    pub fn is_playing(&self) -> bool {
        self.loop_worker.as_ref().is_some_and(Worker::is_running)
    }

    /// Returns the sync metrics recorder for this session.
    pub fn metrics(&self) -> SyncMetrics {
        self.metrics.clone()
    }

    /// Starts playback.
    ///
    /// Fails (returns false) if the video position is negative, with no
    /// state change beyond the initial stop. A missing reader is a silent
    /// no-op. Any prior playback is force-stopped first. Drivers start
    /// gated by the media types the source declares: audio only with
    /// `has_audio`, pre-cache and video only with `has_video`.
    pub fn start_playback(&mut self) -> bool {
        if self.shared.video_position() < 0 {
            return false;
        }

        self.stop_playback();

        let Some(reader) = self.reader.clone() else {
            tracing::debug!("start_playback without a reader attached");
            return true;
        };

        let info = reader.info();
        if info.has_audio {
            self.audio.start(self.shared.video_position(), info);
        }
        if info.has_video {
            self.cache.start(Arc::clone(&reader));
            self.video.start();
        }

        let shared = Arc::clone(&self.shared);
        let metrics = self.metrics.clone();
        let drivers = LoopDrivers {
            audio: self.audio.handle(),
            video: self.video.handle(),
            cache: self.cache.handle(),
        };
        let max_sleep = self.max_sleep;
        self.loop_worker = Some(Worker::spawn("playhead-sync", move |stop| {
            playback_loop(reader, shared, drivers, metrics, max_sleep, stop);
        }));
        true
    }

    /// Stops playback.
    ///
    /// Stops each driver only if it is running and the source declares its
    /// media type, then stops the sync loop; every wait is bounded by
    /// `max_sleep`. Safe to call repeatedly and on a never-started
    /// controller.
    pub fn stop_playback(&mut self) {
        let (has_audio, has_video) = match &self.reader {
            Some(reader) => {
                let info = reader.info();
                (info.has_audio, info.has_video)
            }
            None => (false, false),
        };

        if self.audio.is_running() && has_audio {
            self.audio.stop(self.max_sleep);
        }
        if self.cache.is_running() && has_video {
            self.cache.stop(self.max_sleep);
        }
        if self.video.is_running() && has_video {
            self.video.stop(self.max_sleep);
        }
        if let Some(worker) = self.loop_worker.take() {
            worker.stop_bounded(self.max_sleep);
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.stop_playback();
    }
}
