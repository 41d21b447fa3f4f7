//! Video output driver.
//!
//! The sync loop hands the current frame to the video driver through a
//! single-slot mailbox and fires a render signal; it never waits for the
//! render to complete. The slot is newest-frame-wins: if the driver is still
//! busy when the next frame lands, the unrendered one is replaced. Pixel
//! output itself is out of scope and sits behind the [`Renderer`] seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::reader::Frame;
use crate::worker::Worker;

/// External pixel sink. Implementations draw the frame wherever frames go:
/// a window, a texture upload, a test recorder.
pub trait Renderer: Send {
    fn render(&mut self, frame: &Frame);
}

/// What the sync loop consumes from the video side: a fire-and-forget
/// frame hand-off.
pub trait VideoSink: Send {
    /// Sets the frame to display and signals a render. Never blocks.
    fn present(&self, frame: Frame);
}

/// Single-slot frame mailbox with a render signal.
struct RenderSlot {
    frame: Mutex<Option<Frame>>,
    signal: Condvar,
}

impl RenderSlot {
    fn new() -> Self {
        Self {
            frame: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    fn present(&self, frame: Frame) {
        *self.frame.lock() = Some(frame);
        self.signal.notify_one();
    }

    /// Blocks until a frame is available or `stop` is raised.
    fn wait(&self, stop: &AtomicBool) -> Option<Frame> {
        let mut slot = self.frame.lock();
        loop {
            if stop.load(Ordering::Acquire) {
                return None;
            }
            if let Some(frame) = slot.take() {
                return Some(frame);
            }
            self.signal.wait(&mut slot);
        }
    }

    fn wake(&self) {
        // Taken locked so a waiter between its stop check and `wait` cannot
        // miss the notification.
        let _slot = self.frame.lock();
        self.signal.notify_all();
    }
}

/// Cloneable hand-off handle given to the sync loop.
#[derive(Clone)]
pub struct RenderHandle {
    slot: Arc<RenderSlot>,
}

impl VideoSink for RenderHandle {
    fn present(&self, frame: Frame) {
        self.slot.present(frame);
    }
}

/// Reference video output driver.
///
/// Owns the render thread: waits on the mailbox, hands each received frame
/// to the [`Renderer`]. The renderer is kept behind a shared mutex so the
/// driver can be restarted after a stop without rebuilding it.
pub struct VideoThread {
    slot: Arc<RenderSlot>,
    renderer: Arc<Mutex<Box<dyn Renderer>>>,
    worker: Option<Worker>,
}

impl VideoThread {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self {
            slot: Arc::new(RenderSlot::new()),
            renderer: Arc::new(Mutex::new(renderer)),
            worker: None,
        }
    }

    /// Returns the hand-off handle for the sync loop.
    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Starts the render thread. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let slot = Arc::clone(&self.slot);
        let renderer = Arc::clone(&self.renderer);

        self.worker = Some(Worker::spawn("playhead-video", move |stop| {
            tracing::debug!("video driver started");
            while let Some(frame) = slot.wait(&stop) {
                renderer.lock().render(&frame);
            }
            tracing::debug!("video driver stopped");
        }));
    }

    /// True while the render thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(Worker::is_running)
    }

    /// Stops the render thread, waiting at most `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        match self.worker.take() {
            Some(worker) => {
                // Raise the flag before waking so the waiter observes it.
                worker.stop_flag().store(true, Ordering::Release);
                self.slot.wake();
                worker.stop_bounded(timeout)
            }
            None => true,
        }
    }
}

impl Drop for VideoThread {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI64;
    use std::thread;

    /// Renderer that records the numbers of rendered frames.
    struct RecordingRenderer {
        last_number: Arc<AtomicI64>,
        rendered: Arc<AtomicI64>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, frame: &Frame) {
            self.last_number.store(frame.number, Ordering::Relaxed);
            self.rendered.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn test_frame(number: i64) -> Frame {
        Frame::new(number, 2, 2, vec![0u8; 16].into())
    }

    #[test]
    fn test_presented_frames_reach_renderer() {
        let last_number = Arc::new(AtomicI64::new(0));
        let rendered = Arc::new(AtomicI64::new(0));
        let mut video = VideoThread::new(Box::new(RecordingRenderer {
            last_number: Arc::clone(&last_number),
            rendered: Arc::clone(&rendered),
        }));

        video.start();
        let handle = video.handle();
        handle.present(test_frame(7));

        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while rendered.load(Ordering::Relaxed) < 1 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(last_number.load(Ordering::Relaxed), 7);

        assert!(video.stop(Duration::from_secs(1)));
        assert!(!video.is_running());
    }

    #[test]
    fn test_newest_frame_wins_when_driver_stopped() {
        // With no render thread draining the slot, a second present must
        // replace the first frame rather than queue behind it.
        let video = VideoThread::new(Box::new(RecordingRenderer {
            last_number: Arc::new(AtomicI64::new(0)),
            rendered: Arc::new(AtomicI64::new(0)),
        }));
        let handle = video.handle();

        handle.present(test_frame(1));
        handle.present(test_frame(2));

        let frame = video.slot.frame.lock().take().expect("slot holds a frame");
        assert_eq!(frame.number, 2);
    }

    #[test]
    fn test_stop_wakes_blocked_waiter() {
        let mut video = VideoThread::new(Box::new(RecordingRenderer {
            last_number: Arc::new(AtomicI64::new(0)),
            rendered: Arc::new(AtomicI64::new(0)),
        }));

        video.start();
        // The render thread is parked on an empty slot; stop must wake it.
        assert!(video.stop(Duration::from_secs(1)));
    }
}
