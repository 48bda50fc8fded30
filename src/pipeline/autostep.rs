//! Automatic stepping: a single-flight, re-schedulable timer loop
//!
//! One scheduler exists per stage; only the runtime stage ever arms it. Each
//! tick performs exactly one auto-triggered step, then re-reads the currently
//! configured interval before rescheduling — operators may retune the cadence
//! mid-run. The loop stops itself when a step fails, the machine halts, the
//! interval is disarmed, or the scheduler is stopped concurrently.
//!
//! Stopping cancels only the pending timer wait. An in-flight step future is
//! never cancelled; it completes, and the loop then observes the stop.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::node::StepOutcome;

struct Inner {
    running: AtomicBool,
    // bumped on every start/stop; a loop exits when its generation is stale
    generation: AtomicU64,
    interval: RwLock<Option<Duration>>,
    run: Mutex<Option<Run>>,
}

struct Run {
    cancel: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Per-stage automatic stepping scheduler. Cheap to clone.
#[derive(Clone)]
pub struct AutoStep {
    inner: Arc<Inner>,
}

impl AutoStep {
    /// Create a disarmed scheduler with no interval configured.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                interval: RwLock::new(None),
                run: Mutex::new(None),
            }),
        }
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The currently configured interval, if armed.
    pub fn interval(&self) -> Option<Duration> {
        *self.inner.interval.read()
    }

    /// Configure the tick interval in seconds. Non-finite or non-positive
    /// values disarm the scheduler. Takes effect on the next reschedule; the
    /// pipeline restarts a running loop so the pending timer picks it up too.
    pub fn set_interval_secs(&self, secs: f64) {
        let interval = if secs.is_finite() && secs > 0.0 {
            Some(Duration::from_secs_f64(secs))
        } else {
            None
        };
        *self.inner.interval.write() = interval;
    }

    /// Start the loop, driving `tick` once per interval.
    ///
    /// Single-flight: a no-op returning `false` if already running or if no
    /// positive interval is configured. Returns `true` once the loop is
    /// scheduled.
    pub fn start<F, Fut>(&self, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepOutcome> + Send + 'static,
    {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let Some(first_interval) = *self.inner.interval.read() else {
            self.inner.running.store(false, Ordering::SeqCst);
            return false;
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let cancel = Arc::new(Notify::new());
        let inner = Arc::clone(&self.inner);
        let loop_cancel = Arc::clone(&cancel);

        let task = tokio::spawn(async move {
            let mut wait = first_interval;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = loop_cancel.notified() => break,
                }
                if inner.generation.load(Ordering::SeqCst) != generation {
                    break;
                }

                let outcome = tick().await;

                if inner.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                if !outcome.stepped || outcome.halted {
                    break;
                }
                // interval is re-read fresh for every reschedule
                match *inner.interval.read() {
                    Some(next) => wait = next,
                    None => break,
                }
            }
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.running.store(false, Ordering::SeqCst);
            }
        });

        *self.inner.run.lock() = Some(Run { cancel, task });
        true
    }

    /// Stop the loop and cancel any pending timer. Idempotent. Does not
    /// cancel an in-flight step.
    pub fn stop(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(run) = self.inner.run.lock().take() {
            run.cancel.notify_one();
            // the task handle is detached; the loop exits on its own
            let _ = run.task;
        }
    }
}

impl Default for AutoStep {
    fn default() -> Self {
        Self::new()
    }
}
