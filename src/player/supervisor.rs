//! Timed playback supervisor
//!
//! Every timing run happens on its own worker thread. The caller polls a
//! shared [`RunHandle`] at a fixed interval and gives up after a set number
//! of polls; the worker sees the cancellation at its next check and exits.

use super::program::SequenceProgram;
use super::sequencer::{PlaybackOptions, Sequencer};
use super::time::Time;
use log::{debug, error};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long a cancelled worker gets to exit before it is detached
pub const RECLAIM_GRACE: Duration = Duration::from_secs(2);

const RECLAIM_POLL: Duration = Duration::from_millis(5);

/// Number of polls and the sleep between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub max_iterations: u32,
    pub interval: Duration,
}

impl PollBudget {
    pub fn new(max_iterations: u32, interval: Duration) -> Self {
        Self {
            max_iterations,
            interval,
        }
    }

    /// Wall-clock time the caller waits at most
    pub fn limit(&self) -> Duration {
        self.interval * self.max_iterations
    }
}

#[derive(Debug)]
struct RunState {
    running: bool,
    result: Time,
}

/// Run flag and result shared between the supervisor and its worker
#[derive(Debug)]
pub struct RunHandle {
    state: Mutex<RunState>,
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RunHandle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunState {
                running: true,
                result: Time::UNDETERMINED,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Ask the worker to stop. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        let was_running = state.running;
        state.running = false;
        was_running
    }

    /// Publish the worker's result. Ignored once the run was cancelled.
    pub fn finish(&self, result: Time) -> bool {
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        state.result = result;
        state.running = false;
        true
    }

    pub fn result(&self) -> Time {
        self.state.lock().result
    }
}

/// Time `program` on a worker thread, waiting at most `budget`.
///
/// Never fails: timeouts, malformed data and worker panics all come back
/// as [`Time::UNDETERMINED`].
pub fn run_with_timeout(
    name: &str,
    program: &SequenceProgram,
    options: PlaybackOptions,
    budget: PollBudget,
) -> Time {
    let handle = Arc::new(RunHandle::new());
    let spawned = {
        let handle = Arc::clone(&handle);
        let program = program.clone();
        let name = name.to_string();
        thread::Builder::new()
            .name(format!("timing-{}", name))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    Sequencer::new(&program, options).run(|| !handle.is_running())
                }));
                let time = match outcome {
                    Ok(Ok(outcome)) => outcome.time(),
                    Ok(Err(e)) => {
                        debug!("{}: {}", name, e);
                        Time::UNDETERMINED
                    }
                    Err(_) => {
                        error!("{}: timing run panicked", name);
                        Time::UNDETERMINED
                    }
                };
                handle.finish(time);
            })
    };
    let worker = match spawned {
        Ok(worker) => worker,
        Err(e) => {
            error!("{}: unable to start timing thread: {}", name, e);
            return Time::UNDETERMINED;
        }
    };

    for _ in 0..budget.max_iterations {
        if !handle.is_running() {
            break;
        }
        thread::sleep(budget.interval);
    }

    if handle.cancel() {
        debug!("{}: no result within {:?}", name, budget.limit());
        if reclaim(name, worker) {
            debug!("{}: timing thread stopped", name);
        }
        return Time::UNDETERMINED;
    }
    let _ = worker.join();
    handle.result()
}

/// Join a cancelled worker, detaching it if it does not exit within the
/// grace period. Returns `true` when the worker was joined.
fn reclaim(name: &str, worker: JoinHandle<()>) -> bool {
    let deadline = Instant::now() + RECLAIM_GRACE;
    while !worker.is_finished() {
        if Instant::now() >= deadline {
            error!("{}: timing thread ignored cancellation, detaching it", name);
            return false;
        }
        thread::sleep(RECLAIM_POLL);
    }
    let _ = worker.join();
    true
}
