//! Pausable periodic execution loop.
//!
//! One background thread waits on a cancellable timer and, while the scheduler
//! is `Active`, runs a job on every wake. Non-empty job results go to the
//! registered callback. Control calls (`pause`, `resume`, `register`,
//! `unregister`, `stop`) may come from any thread at any time.
//!
//! All shared state sits behind one mutex paired with one condvar. The lock is
//! held only for state transitions, never while the job or a callback runs.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Receives the formatted result of one tick.
pub type ResultCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Ticks are no-ops.
    Idle,
    /// Ticks run the job.
    Active,
}

/// Counters for observing the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Wakes of the loop, whether or not the job ran.
    pub ticks: u64,
    /// Job invocations.
    pub runs: u64,
    /// Results handed to a callback.
    pub deliveries: u64,
    /// Non-empty results discarded because no callback was registered.
    pub dropped: u64,
}

struct SchedulerState {
    phase: SchedulerPhase,
    callback: Option<ResultCallback>,
    /// A callback invocation is in progress on the worker thread.
    delivering: bool,
    started: bool,
    stopped: bool,
    worker_id: Option<ThreadId>,
    stats: SchedulerStats,
}

struct Shared {
    state: Mutex<SchedulerState>,
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct PeriodicScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicScheduler {
    /// Create an idle scheduler. A zero `interval` runs the job back-to-back
    /// while active.
    pub fn new(interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    phase: SchedulerPhase::Idle,
                    callback: None,
                    delivering: false,
                    started: false,
                    stopped: false,
                    worker_id: None,
                    stats: SchedulerStats::default(),
                }),
                signal: Condvar::new(),
            }),
            interval,
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the background loop. The scheduler starts `Idle`.
    ///
    /// `job` returns the formatted result of one run, or `None` when there is
    /// nothing to deliver.
    pub fn start<F>(&self, job: F) -> Result<()>
    where
        F: FnMut() -> Option<String> + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.stopped {
            return Err(anyhow!("scheduler already stopped"));
        }
        if state.started {
            return Err(anyhow!("scheduler already started"));
        }

        let shared = self.shared.clone();
        let interval = self.interval;
        let handle = std::thread::Builder::new()
            .name("label-scheduler".to_string())
            .spawn(move || run_loop(shared, interval, job))
            .context("failed to spawn scheduler thread")?;

        state.started = true;
        state.worker_id = Some(handle.thread().id());
        drop(state);

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        log::info!("scheduler started (interval {:?})", self.interval);
        Ok(())
    }

    /// Idle → Active. Takes effect at the next wake; missed ticks are not replayed.
    pub fn resume(&self) {
        let mut state = self.shared.lock();
        if state.phase != SchedulerPhase::Active {
            log::debug!("scheduler resumed");
        }
        state.phase = SchedulerPhase::Active;
        drop(state);
        self.shared.signal.notify_all();
    }

    /// Active → Idle. A run already in progress is allowed to finish.
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        if state.phase != SchedulerPhase::Idle {
            log::debug!("scheduler paused");
        }
        state.phase = SchedulerPhase::Idle;
    }

    /// Replace the delivery target.
    pub fn register(&self, callback: ResultCallback) {
        self.shared.lock().callback = Some(callback);
    }

    /// Clear the delivery target.
    ///
    /// When this returns, the previous callback is not running and will not be
    /// called again. Called from inside a callback, it only clears the target.
    pub fn unregister(&self) {
        let mut state = self.shared.lock();
        state.callback = None;
        if state.worker_id == Some(std::thread::current().id()) {
            return;
        }
        let _state = self
            .shared
            .signal
            .wait_while(state, |state| state.delivering)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Cancel the pending wait and end the loop. Idempotent.
    pub fn stop(&self) {
        let worker_id = {
            let mut state = self.shared.lock();
            if !state.stopped {
                log::info!("scheduler stopping");
            }
            state.stopped = true;
            state.worker_id
        };
        self.shared.signal.notify_all();

        if worker_id == Some(std::thread::current().id()) {
            // Stop requested by the job or a callback; the loop exits on its own.
            return;
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("scheduler thread panicked");
            }
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.shared.lock().phase
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopped
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.lock().stats
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clears the in-flight delivery marker even if the callback panics.
struct DeliveryGuard<'a> {
    shared: &'a Shared,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().delivering = false;
        self.shared.signal.notify_all();
    }
}

fn run_loop<F>(shared: Arc<Shared>, interval: Duration, mut job: F)
where
    F: FnMut() -> Option<String>,
{
    loop {
        let state = shared.lock();
        // Cancellable timed wait: only `stop` cuts it short.
        let (mut state, _) = shared
            .signal
            .wait_timeout_while(state, interval, |state| !state.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            break;
        }
        state.stats.ticks += 1;

        if state.phase == SchedulerPhase::Idle {
            if interval.is_zero() {
                // Nothing to pace against; sleep until resumed or stopped.
                let _state = shared
                    .signal
                    .wait_while(state, |state| {
                        !state.stopped && state.phase == SchedulerPhase::Idle
                    })
                    .unwrap_or_else(PoisonError::into_inner);
            }
            continue;
        }
        state.stats.runs += 1;
        drop(state);

        let result = job();
        let Some(result) = result.filter(|result| !result.is_empty()) else {
            continue;
        };

        let callback = {
            let mut state = shared.lock();
            match state.callback.clone() {
                Some(callback) => {
                    state.delivering = true;
                    state.stats.deliveries += 1;
                    callback
                }
                None => {
                    state.stats.dropped += 1;
                    log::debug!("no subscriber; dropping result [{}]", result);
                    continue;
                }
            }
        };
        let _delivery = DeliveryGuard { shared: &shared };
        callback(&result);
    }
    log::info!("scheduler loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_tracks_transitions() {
        let scheduler = PeriodicScheduler::new(Duration::from_millis(5));
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
        scheduler.resume();
        assert_eq!(scheduler.phase(), SchedulerPhase::Active);
        scheduler.pause();
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn reports_configured_interval() {
        assert_eq!(
            PeriodicScheduler::new(Duration::from_millis(250)).interval(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn start_twice_is_rejected() -> Result<()> {
        let scheduler = PeriodicScheduler::new(Duration::from_millis(5));
        scheduler.start(|| None)?;
        assert!(scheduler.start(|| None).is_err());
        scheduler.stop();
        Ok(())
    }

    #[test]
    fn stop_is_idempotent_and_blocks_restart() -> Result<()> {
        let scheduler = PeriodicScheduler::new(Duration::from_secs(3600));
        scheduler.start(|| None)?;
        scheduler.stop();
        scheduler.stop();
        assert!(scheduler.is_stopped());
        assert!(scheduler.start(|| None).is_err());
        Ok(())
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let scheduler = PeriodicScheduler::new(Duration::ZERO);
        scheduler.stop();
        assert!(scheduler.is_stopped());
    }
}
