//! Worker thread plumbing shared by the output drivers and the playback loop.
//!
//! Each driver runs one dedicated thread with a cooperative stop flag. Stops
//! are bounded: the stopper waits up to a timeout for the thread to exit,
//! then detaches it and moves on. Exit is observed through a zero-message
//! crossbeam channel whose sender is dropped when the thread body returns,
//! so a disconnected channel means "exited" and a timeout means "still
//! running".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/// A named worker thread with a stop flag and a bounded stop.
pub(crate) struct Worker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    exited: Receiver<()>,
}

impl Worker {
    /// Spawns a worker thread. The body receives the stop flag and is
    /// expected to poll it at its own cadence.
    pub(crate) fn spawn<F>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (exit_tx, exited) = bounded::<()>(0);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Moved in so the sender drops (disconnecting the channel)
                // when the body returns or unwinds.
                let _exit_tx: Sender<()> = exit_tx;
                body(thread_stop);
            })
            .expect("spawn worker thread");

        Self {
            name,
            handle: Some(handle),
            stop,
            exited,
        }
    }

    /// Returns the shared stop flag.
    pub(crate) fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// True while the worker thread is still running.
    pub(crate) fn is_running(&self) -> bool {
        matches!(self.exited.try_recv(), Err(TryRecvError::Empty))
    }

    /// Requests a stop and waits up to `timeout` for the thread to exit.
    ///
    /// Returns true if the thread exited within the bound. On timeout the
    /// thread is detached; stopping stays best-effort.
    pub(crate) fn stop_bounded(mut self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::Release);
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    worker = self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "worker did not stop within bound, detaching"
                );
                self.handle.take();
                false
            }
        }
    }
}
