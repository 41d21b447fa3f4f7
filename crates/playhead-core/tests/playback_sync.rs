//! Playback synchronization integration tests.
//!
//! These drive a full [`PlayerController`] — synthetic reader, real output
//! drivers, real sync loop — and assert on externally observable behavior:
//! position advancement, pause holds, drift accounting, and lifecycle
//! idempotence. Timing assertions are deliberately loose; the point is the
//! control behavior, not scheduler precision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use playhead_core::{
    Frame, PlayerController, Renderer, SyntheticReader,
};

/// Renderer that counts frames and remembers the last frame number.
struct CountingRenderer {
    rendered: Arc<AtomicU64>,
}

impl Renderer for CountingRenderer {
    fn render(&mut self, _frame: &Frame) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }
}

fn player_with_reader(fps: f64, length: i64) -> (PlayerController, Arc<AtomicU64>) {
    let rendered = Arc::new(AtomicU64::new(0));
    let mut player = PlayerController::new(Box::new(CountingRenderer {
        rendered: Arc::clone(&rendered),
    }));
    player.set_reader(Arc::new(SyntheticReader::new(fps, length)));
    (player, rendered)
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

#[test]
fn playback_advances_and_renders() {
    let (mut player, rendered) = player_with_reader(100.0, 10_000);

    assert!(player.start_playback());
    assert!(player.is_playing());

    assert!(
        wait_until(Duration::from_secs(2), || player.position() > 5),
        "position advances under normal playback"
    );
    assert!(
        wait_until(Duration::from_secs(2), || rendered.load(Ordering::Relaxed) > 0),
        "frames reach the renderer"
    );

    let snap = player.metrics().snapshot();
    assert!(snap.frames_presented > 0);
    assert!(snap.samples > 0);

    player.stop_playback();
    assert!(!player.is_playing());
}

#[test]
fn pause_holds_position() {
    let (mut player, _rendered) = player_with_reader(100.0, 10_000);

    assert!(player.start_playback());
    assert!(wait_until(Duration::from_secs(2), || player.position() > 3));

    player.set_speed(0);
    // Let the in-flight iteration drain, then sample the held position.
    thread::sleep(Duration::from_millis(100));
    let held = player.position();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(player.position(), held, "paused position never advances");
    assert_eq!(player.speed(), 0);

    // Resume moves again.
    player.set_speed(1);
    assert!(
        wait_until(Duration::from_secs(2), || player.position() > held),
        "resume advances past the held position"
    );

    player.stop_playback();
}

#[test]
fn natural_end_parks_on_last_frame() {
    let (mut player, _rendered) = player_with_reader(250.0, 20);

    assert!(player.start_playback());

    // 20 frames at 4ms each is under 100ms of content. Forward stepping is
    // gated at the boundary, so the loop parks on the last frame.
    assert!(
        wait_until(Duration::from_secs(2), || player.position() == 20),
        "playback reaches the last frame: position={}",
        player.position()
    );
    thread::sleep(Duration::from_millis(100));
    assert_eq!(player.position(), 20, "position never leaves the source range");

    player.stop_playback();
}

#[test]
fn seek_past_end_forces_pause() {
    let (mut player, _rendered) = player_with_reader(250.0, 20);

    // Start already past the end: the reader has nothing to serve, so the
    // loop must force speed to 0 and idle rather than crash or spin.
    player.seek(30);
    assert!(player.start_playback());
    assert!(
        wait_until(Duration::from_secs(2), || player.speed() == 0),
        "running past the end forces pause: speed={}",
        player.speed()
    );
    assert_eq!(player.position(), 30);

    player.stop_playback();
}

#[test]
fn seek_while_paused_displays_once() {
    let (mut player, rendered) = player_with_reader(100.0, 10_000);

    assert!(player.start_playback());
    assert!(wait_until(Duration::from_secs(2), || player.position() > 3));

    player.set_speed(0);
    thread::sleep(Duration::from_millis(100));
    let before = rendered.load(Ordering::Relaxed);

    player.seek(500);
    assert!(
        wait_until(Duration::from_secs(2), || {
            rendered.load(Ordering::Relaxed) > before
        }),
        "a paused seek still displays the new frame"
    );
    // The displayed position sticks; playback stays paused.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(player.position(), 500);
    assert_eq!(player.speed(), 0);

    player.stop_playback();
}

#[test]
fn stop_is_idempotent_and_safe_before_start() {
    let (mut player, _rendered) = player_with_reader(100.0, 1_000);

    // Never started: both calls are no-ops.
    player.stop_playback();
    player.stop_playback();

    assert!(player.start_playback());
    player.stop_playback();
    player.stop_playback();
    assert!(!player.is_playing());

    // And the controller restarts cleanly afterwards.
    assert!(player.start_playback());
    assert!(player.is_playing());
    player.stop_playback();
}

#[test]
fn drift_stays_bounded_in_steady_state() {
    let (mut player, _rendered) = player_with_reader(200.0, 10_000);

    assert!(player.start_playback());
    thread::sleep(Duration::from_millis(400));
    player.stop_playback();

    // Audio and video tick from the same start at the same rate; the drift
    // corrector must keep the streams close on average. Scheduler hiccups
    // can spike a single sample, so the bound is on the mean.
    let snap = player.metrics().snapshot();
    assert!(snap.samples > 10, "loop actually ran: {} samples", snap.samples);
    assert!(
        snap.average_abs_drift() < 10.0,
        "streams drifted apart: {snap:?}"
    );
}
