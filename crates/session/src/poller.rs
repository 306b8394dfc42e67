//! Cancellable, single-flight status polling.
//!
//! A poll is one Tokio task that fetches the job status immediately and
//! then once per interval until the job reaches a terminal status, a cap
//! is hit, or the poll is cancelled. Events are handed to a callback in
//! the order the responses arrive; requests never overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lpgen_client::JobBackend;
use lpgen_core::{JobId, JobSnapshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;

/// Emitted by a running poll.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A status snapshot was fetched.
    Snapshot(JobSnapshot),
    /// The poll gave up. No further events follow.
    Failed(PollError),
}

/// Why a poll gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Lost contact with the server after {failures} failed status checks: {last_error}")]
    TooManyFailures { failures: u32, last_error: String },

    #[error("Generation did not finish within {} seconds", .limit.as_secs())]
    TimedOut { limit: Duration },
}

/// Handle to a running poll task.
struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn stop(self) {
        self.cancel.cancel();
        self.task.abort();
        tracing::debug!(job_id = %self.job_id, "Status poll cancelled");
    }
}

/// Runs at most one status poll at a time.
pub struct Poller {
    backend: Arc<dyn JobBackend>,
    config: PollConfig,
    active: Mutex<Option<PollHandle>>,
    timers_started: AtomicUsize,
}

impl Poller {
    pub fn new(backend: Arc<dyn JobBackend>, config: PollConfig) -> Self {
        Self {
            backend,
            config,
            active: Mutex::new(None),
            timers_started: AtomicUsize::new(0),
        }
    }

    /// Start polling `job_id`, delivering events to `on_event`.
    ///
    /// Returns `false` without doing anything if a poll is already
    /// running. Must be called from within a Tokio runtime.
    pub fn start<F>(&self, job_id: &str, on_event: F) -> bool
    where
        F: FnMut(PollEvent) + Send + 'static,
    {
        let mut active = self.lock_active();
        if let Some(handle) = active.as_ref() {
            if !handle.task.is_finished() {
                tracing::debug!(
                    job_id,
                    active_job_id = %handle.job_id,
                    "Status poll already running; start ignored",
                );
                return false;
            }
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_poll(
            Arc::clone(&self.backend),
            job_id.to_string(),
            self.config.clone(),
            cancel.clone(),
            on_event,
        ));
        self.timers_started.fetch_add(1, Ordering::SeqCst);

        *active = Some(PollHandle {
            job_id: job_id.to_string(),
            cancel,
            task,
        });
        true
    }

    /// Stop the running poll, if any.
    ///
    /// Synchronous: the token is cancelled and the task aborted before
    /// this returns, so its timer is released at the task's next await.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock_active().take() {
            handle.stop();
        }
    }

    /// A poll task exists and has not finished.
    pub fn is_active(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Number of poll timers created over the poller's lifetime.
    pub fn timers_started(&self) -> usize {
        self.timers_started.load(Ordering::SeqCst)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<PollHandle>> {
        // The guarded value is a plain handle; a panic while holding the
        // lock cannot leave it half-updated.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The poll loop. Ends on a terminal status, a cap, or cancellation.
async fn run_poll<F>(
    backend: Arc<dyn JobBackend>,
    job_id: JobId,
    config: PollConfig,
    cancel: CancellationToken,
    mut on_event: F,
) where
    F: FnMut(PollEvent) + Send + 'static,
{
    // The first tick completes immediately.
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let started = Instant::now();
    let mut failures: u32 = 0;

    tracing::info!(
        job_id = %job_id,
        poll_interval_ms = config.interval.as_millis() as u64,
        "Status poll started",
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Some(limit) = config.max_duration {
            if started.elapsed() >= limit {
                tracing::warn!(job_id = %job_id, limit_secs = limit.as_secs(), "Status poll timed out");
                on_event(PollEvent::Failed(PollError::TimedOut { limit }));
                break;
            }
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            fetched = backend.status(&job_id) => fetched,
        };

        match fetched {
            Ok(snapshot) => {
                failures = 0;
                let status = snapshot.status;
                tracing::debug!(
                    job_id = %job_id,
                    status = %status,
                    progress = snapshot.progress_percent(),
                    current_step = %snapshot.current_step,
                    "Status received",
                );
                on_event(PollEvent::Snapshot(snapshot));
                if status.is_terminal() {
                    tracing::info!(job_id = %job_id, status = %status, "Status poll finished");
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(job_id = %job_id, failures, error = %e, "Status check failed");
                if config.max_consecutive_failures.is_some_and(|max| failures >= max) {
                    on_event(PollEvent::Failed(PollError::TooManyFailures {
                        failures,
                        last_error: e.to_string(),
                    }));
                    break;
                }
            }
        }
    }

    tracing::debug!(job_id = %job_id, "Status poll stopped");
}
