//! Frame source boundary.
//!
//! The playback engine never decodes media itself. It pulls frames from a
//! [`FrameReader`], an abstraction over whatever actually produces decoded
//! frames (a demuxer/decoder stack, a frame cache, a network source). The
//! reader owns the decoded pixel data; the engine only holds cheap [`Frame`]
//! handles for the duration of a display cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Static metadata describing a reader's media streams.
///
/// Fixed for the lifetime of a reader; the engine reads it once per
/// playback session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderInfo {
    /// True if the source carries an audio stream.
    pub has_audio: bool,
    /// True if the source carries a video stream.
    pub has_video: bool,
    /// Native video frame rate in frames per second.
    pub fps: f64,
    /// Number of video frames in the source. Positions are 1-based.
    pub video_length: i64,
}

impl ReaderInfo {
    /// On-screen time budget for a single frame at the native frame rate.
    ///
    /// A non-positive fps would make the budget unbounded, so it is clamped
    /// before the division.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1.0))
    }
}

/// A decoded video frame handle.
///
/// `Frame` is a cheap clone: the pixel payload is shared, and ownership of
/// the underlying data stays with the reader/cache layer. The engine keeps
/// at most one current frame at a time and shares it with the video output
/// driver for one display cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 1-based frame number this frame was decoded for.
    pub number: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    data: Arc<[u8]>,
}

impl Frame {
    /// Creates a frame from its number, dimensions, and pixel payload.
    pub fn new(number: i64, width: u32, height: u32, data: Arc<[u8]>) -> Self {
        Self {
            number,
            width,
            height,
            data,
        }
    }

    /// Borrows the pixel payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Errors a reader can report when asked for a frame.
///
/// Both variants are recoverable from the engine's perspective: frame
/// retrieval absorbs them into a "no frame this iteration" outcome and the
/// playback loop idles via its pause detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The reader has been closed and can no longer produce frames.
    Closed,
    /// The requested position lies outside the readable range.
    OutOfBounds(i64),
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Closed => write!(f, "reader is closed"),
            ReaderError::OutOfBounds(position) => {
                write!(f, "frame position {position} is out of bounds")
            }
        }
    }
}

impl std::error::Error for ReaderError {}

/// Capability interface for anything that can decode frames by position.
///
/// Implementations are shared across the playback loop and the pre-cache
/// driver, so they take `&self` and handle their own interior state.
pub trait FrameReader: Send + Sync {
    /// Returns the stream metadata.
    fn info(&self) -> ReaderInfo;

    /// Decodes (or serves from cache) the frame at `position`.
    fn get_frame(&self, position: i64) -> Result<Frame, ReaderError>;
}

/// Deterministic procedural reader for demos and tests.
///
/// Produces a small solid-color frame whose fill byte is derived from the
/// frame number, so consumers can verify which frame they were handed.
/// `close()` makes every subsequent request fail with [`ReaderError::Closed`],
/// which exercises the engine's silent-absorption path.
pub struct SyntheticReader {
    info: ReaderInfo,
    closed: AtomicBool,
    frames_served: AtomicU64,
}

impl SyntheticReader {
    const WIDTH: u32 = 8;
    const HEIGHT: u32 = 8;

    /// Creates a reader with both audio and video streams.
    pub fn new(fps: f64, video_length: i64) -> Self {
        Self::with_streams(fps, video_length, true, true)
    }

    /// Creates a reader with only a video stream.
    pub fn video_only(fps: f64, video_length: i64) -> Self {
        Self::with_streams(fps, video_length, false, true)
    }

    fn with_streams(fps: f64, video_length: i64, has_audio: bool, has_video: bool) -> Self {
        Self {
            info: ReaderInfo {
                has_audio,
                has_video,
                fps,
                video_length,
            },
            closed: AtomicBool::new(false),
            frames_served: AtomicU64::new(0),
        }
    }

    /// Closes the reader; subsequent `get_frame` calls fail with `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Number of frames served so far (diagnostic).
    pub fn frames_served(&self) -> u64 {
        self.frames_served.load(Ordering::Relaxed)
    }
}

impl FrameReader for SyntheticReader {
    fn info(&self) -> ReaderInfo {
        self.info
    }

    fn get_frame(&self, position: i64) -> Result<Frame, ReaderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ReaderError::Closed);
        }
        if position < 1 || position > self.info.video_length {
            return Err(ReaderError::OutOfBounds(position));
        }

        self.frames_served.fetch_add(1, Ordering::Relaxed);
        let fill = (position.wrapping_mul(7) & 0xff) as u8;
        let data: Arc<[u8]> =
            vec![fill; (Self::WIDTH * Self::HEIGHT * 4) as usize].into();
        Ok(Frame::new(position, Self::WIDTH, Self::HEIGHT, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration_from_fps() {
        let info = ReaderInfo {
            has_audio: true,
            has_video: true,
            fps: 25.0,
            video_length: 100,
        };
        assert_eq!(info.frame_duration(), Duration::from_millis(40));
    }

    #[test]
    fn test_frame_duration_clamps_bad_fps() {
        let info = ReaderInfo {
            has_audio: false,
            has_video: true,
            fps: 0.0,
            video_length: 10,
        };
        assert_eq!(info.frame_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_synthetic_reader_serves_requested_position() {
        let reader = SyntheticReader::new(30.0, 50);

        let frame = reader.get_frame(17).expect("in-bounds frame");
        assert_eq!(frame.number, 17);
        assert!(!frame.data().is_empty());

        // Distinct positions get distinct payloads.
        let other = reader.get_frame(18).expect("in-bounds frame");
        assert_ne!(frame.data()[0], other.data()[0]);
    }

    #[test]
    fn test_synthetic_reader_bounds() {
        let reader = SyntheticReader::new(30.0, 50);

        assert_eq!(reader.get_frame(0), Err(ReaderError::OutOfBounds(0)));
        assert_eq!(reader.get_frame(51), Err(ReaderError::OutOfBounds(51)));
        assert!(reader.get_frame(1).is_ok());
        assert!(reader.get_frame(50).is_ok());
    }

    #[test]
    fn test_synthetic_reader_close() {
        let reader = SyntheticReader::new(30.0, 50);
        assert!(reader.get_frame(1).is_ok());

        reader.close();
        assert_eq!(reader.get_frame(1), Err(ReaderError::Closed));
    }
}
