//! playhead-core: real-time A/V playback synchronization.
//!
//! This crate decides *which* frame to show *when*. It contains:
//!
//! - Frame source boundary: [`reader`] (the [`reader::FrameReader`] seam,
//!   frame handles, recoverable reader errors)
//! - Output drivers: [`audio`], [`video`], [`cache`] — each a thread-backed
//!   reference driver behind the seam the sync loop consumes
//! - The sync engine: [`player`] (controller, lifecycle, the loop itself),
//!   [`sync`] (pure drift-correction policy), [`sync_metrics`]
//!   (lock-free instrumentation)
//!
//! Decoding, cache storage, and pixel output are out of scope: they sit
//! behind the `FrameReader` and `Renderer` traits so the engine is testable
//! against fakes.

pub mod audio;
pub mod cache;
pub mod player;
pub mod reader;
pub mod sync;
pub mod sync_metrics;
pub mod video;

mod worker;

pub use audio::{AudioClock, AudioHandle, AudioThread};
pub use cache::{CacheHandle, CacheNotifier, CacheThread};
pub use player::PlayerController;
pub use reader::{Frame, FrameReader, ReaderError, ReaderInfo, SyntheticReader};
pub use sync::{plan_iteration, IterationPlan, CATCH_UP_LAG_FRAMES, DEFAULT_MAX_SLEEP};
pub use sync_metrics::{SyncMetrics, SyncSnapshot, DRIFT_THRESHOLD_FRAMES};
pub use video::{RenderHandle, Renderer, VideoSink, VideoThread};
