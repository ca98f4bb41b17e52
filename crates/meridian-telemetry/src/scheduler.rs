// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The supervised background thread that drives collection cycles.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use meridian_core::SdkEventSource;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How the worker thread ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stopped on request after running this many cycles.
    Cancelled {
        /// Completed cycles.
        cycles: u64,
    },
    /// A cycle panicked and the worker died.
    Panicked(String),
}

/// Runs a cycle at a fixed interval on a dedicated thread.
///
/// The first cycle starts one interval after spawning. Each later cycle
/// starts `interval` after the previous one started; a cycle that overruns
/// the interval is followed immediately by the next one. Cycles never
/// overlap. Cancellation is observed while waiting, so [`stop`](Self::stop)
/// returns after at most one in-flight cycle.
#[derive(Debug)]
pub struct CollectionWorker {
    interval: Duration,
    cancel: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<WorkerExit>>,
    running: Arc<AtomicBool>,
}

impl CollectionWorker {
    /// Spawns the worker thread.
    pub fn spawn<F>(interval: Duration, diagnostics: SdkEventSource, mut cycle: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("meridian-collector".to_string())
            .spawn(move || {
                log::info!("Collection worker started (interval {:?}).", interval);
                diagnostics.worker_started(interval);

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_cycles(interval, &cancel_rx, &mut cycle)
                }));
                flag.store(false, Ordering::SeqCst);

                match outcome {
                    Ok(cycles) => {
                        log::info!("Collection worker stopped after {} cycles.", cycles);
                        diagnostics.worker_stopped(cycles);
                        WorkerExit::Cancelled { cycles }
                    }
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        log::error!("Collection worker terminated: {}", reason);
                        diagnostics.worker_terminated(&reason);
                        WorkerExit::Panicked(reason)
                    }
                }
            });

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        Ok(Self {
            interval,
            cancel: Some(cancel_tx),
            handle: Some(handle),
            running,
        })
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` while the thread is looping.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cancels the worker and waits for it. Returns how it ended, or `None`
    /// if it was already stopped.
    pub fn stop(&mut self) -> Option<WorkerExit> {
        // Dropping the sender disconnects the channel, which wakes the wait.
        self.cancel.take();
        let handle = self.handle.take()?;
        let exit = match handle.join() {
            Ok(exit) => exit,
            Err(payload) => WorkerExit::Panicked(panic_message(payload.as_ref())),
        };
        Some(exit)
    }
}

impl Drop for CollectionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_cycles(interval: Duration, cancel: &Receiver<()>, cycle: &mut dyn FnMut()) -> u64 {
    if cancelled_within(cancel, interval) {
        return 0;
    }

    let mut cycles = 0;
    loop {
        let start_time = Instant::now();
        cycle();
        cycles += 1;

        let delay = interval.saturating_sub(start_time.elapsed());
        if cancelled_within(cancel, delay) {
            return cycles;
        }
    }
}

/// Waits up to `timeout` for cancellation. A zero timeout only polls.
fn cancelled_within(cancel: &Receiver<()>, timeout: Duration) -> bool {
    match cancel.recv_timeout(timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
