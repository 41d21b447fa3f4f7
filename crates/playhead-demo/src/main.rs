//! Headless playhead demo.
//!
//! Runs a scripted playback session against a synthetic frame source and
//! prints a sync report at the end. No GUI required.
//!
//! Usage:
//!   # Defaults: 25 fps, 500-frame source
//!   cargo run -p playhead-demo
//!
//!   # Custom fps and length
//!   cargo run -p playhead-demo -- 30 900
//!
//! For the per-iteration sync records:
//!   RUST_LOG=playhead_core=debug cargo run -p playhead-demo

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use playhead_core::{Frame, PlayerController, Renderer, SyntheticReader};
use tracing_subscriber::EnvFilter;

/// Default source frame rate.
const DEFAULT_FPS: f64 = 25.0;

/// Default source length in frames.
const DEFAULT_LENGTH: i64 = 500;

/// Renderer that counts frames and logs one line every second of content.
struct ConsoleRenderer {
    rendered: Arc<AtomicU64>,
    log_every: u64,
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, frame: &Frame) {
        let n = self.rendered.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.log_every == 0 {
            tracing::info!(
                frame = frame.number,
                rendered = n,
                "{}x{} frame on screen",
                frame.width,
                frame.height
            );
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let fps = args
        .first()
        .and_then(|a| a.parse().ok())
        .unwrap_or(DEFAULT_FPS);
    let length = args
        .get(1)
        .and_then(|a| a.parse().ok())
        .unwrap_or(DEFAULT_LENGTH);

    tracing::info!(fps, length, "starting scripted playback");

    let rendered = Arc::new(AtomicU64::new(0));
    let mut player = PlayerController::new(Box::new(ConsoleRenderer {
        rendered: Arc::clone(&rendered),
        log_every: (fps as u64).max(1),
    }));
    player.set_reader(Arc::new(SyntheticReader::new(fps, length)));

    if !player.start_playback() {
        tracing::error!("playback refused to start");
        return;
    }

    // Script: normal play, double speed, pause, resume, rewind a little.
    thread::sleep(Duration::from_secs(2));
    tracing::info!(position = player.position(), "switching to double speed");
    player.set_speed(2);

    thread::sleep(Duration::from_secs(1));
    tracing::info!(position = player.position(), "pausing");
    player.set_speed(0);

    thread::sleep(Duration::from_millis(500));
    tracing::info!(position = player.position(), "resuming at normal speed");
    player.set_speed(1);

    thread::sleep(Duration::from_secs(1));
    tracing::info!(position = player.position(), "rewinding");
    player.set_speed(-1);

    thread::sleep(Duration::from_secs(1));
    player.stop_playback();

    let snap = player.metrics().snapshot();
    tracing::info!(
        frames_presented = snap.frames_presented,
        frames_rendered = rendered.load(Ordering::Relaxed),
        final_position = player.position(),
        current_drift = snap.current_drift,
        max_drift_ahead = snap.max_drift_ahead,
        max_drift_behind = snap.max_drift_behind,
        average_abs_drift = snap.average_abs_drift(),
        out_of_sync = snap.out_of_sync,
        catch_up_jumps = snap.catch_up_jumps,
        frames_skipped = snap.frames_skipped,
        "sync report"
    );
}
