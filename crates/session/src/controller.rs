//! Generation controller.
//!
//! [`GenerationController`] owns the single [`Session`] of one user. All
//! changes go through the session's `watch` channel with
//! [`send_if_modified`](tokio::sync::watch::Sender::send_if_modified), so
//! checking the epoch and applying an update happen under one lock. A poll
//! event that arrives after a reset, a retry, or shutdown sees a different
//! epoch (or the shutdown flag) and is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lpgen_client::{ApiError, JobBackend};
use lpgen_core::job::reconcile_steps;
use lpgen_core::{GenerationRequest, JobId, JobSnapshot, JobStatus};
use lpgen_preview::PreviewRenderer;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::error::SessionError;
use crate::poller::{PollEvent, Poller};
use crate::session::Session;
use crate::state::GenerationState;

/// Shown when the backend reports a failed job without an error text.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// File name of a downloaded bundle.
pub fn bundle_file_name(job_id: &str) -> String {
    format!("lp-{job_id}.zip")
}

/// Write a downloaded bundle to `dir/lp-{job_id}.zip`, creating `dir` if
/// needed.
pub async fn save_bundle(dir: &Path, job_id: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(bundle_file_name(job_id));
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(job_id, path = %path.display(), bytes = bytes.len(), "Bundle saved");
    Ok(path)
}

/// State reachable from the poll callback.
struct Shared {
    session: watch::Sender<Session>,
    renderer: PreviewRenderer,
    shut_down: CancellationToken,
}

impl Shared {
    fn is_shut_down(&self) -> bool {
        self.shut_down.is_cancelled()
    }

    /// Apply a poll event if it still belongs to the current job.
    fn apply(&self, epoch: u64, event: PollEvent) {
        self.session.send_if_modified(|session| {
            if self.is_shut_down()
                || session.epoch != epoch
                || session.state != GenerationState::Processing
            {
                tracing::debug!(epoch, current_epoch = session.epoch, "Dropping stale poll event");
                return false;
            }

            match event {
                PollEvent::Snapshot(snapshot) => self.apply_snapshot(session, snapshot),
                PollEvent::Failed(e) => {
                    tracing::error!(job_id = ?session.job_id, error = %e, "Status polling gave up");
                    advance(session, GenerationState::Error);
                    session.error = Some(e.to_string());
                }
            }
            true
        });
    }

    fn apply_snapshot(&self, session: &mut Session, snapshot: JobSnapshot) {
        if !snapshot.steps.is_empty() {
            session.steps = reconcile_steps(&session.steps, snapshot.steps.clone());
        }

        match snapshot.status {
            JobStatus::Completed => {
                advance(session, GenerationState::Completed);
                session.result = snapshot.result.clone();
                session.preview = match &session.result {
                    Some(result) => Some(Arc::new(self.renderer.render(&snapshot.job_id, result))),
                    None => {
                        tracing::warn!(job_id = %snapshot.job_id, "Job completed without a result");
                        None
                    }
                };
                tracing::info!(job_id = %snapshot.job_id, "Generation completed");
            }
            JobStatus::Error => {
                let message = snapshot
                    .error
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(UNKNOWN_ERROR)
                    .to_string();
                tracing::error!(job_id = %snapshot.job_id, error = %message, "Generation failed");
                advance(session, GenerationState::Error);
                session.error = Some(message);
            }
            JobStatus::Pending | JobStatus::Processing => {}
        }

        session.snapshot = Some(snapshot);
    }
}

/// Move `session` to `to` through the state machine.
fn advance(session: &mut Session, to: GenerationState) {
    match session.state.transition(to) {
        Ok(next) => session.state = next,
        Err(e) => tracing::warn!(error = %e, "Transition rejected"),
    }
}

/// Drives one generation lifecycle: submit, poll, preview, retry, reset.
pub struct GenerationController {
    backend: Arc<dyn JobBackend>,
    poller: Poller,
    shared: Arc<Shared>,
}

impl GenerationController {
    pub fn new(backend: Arc<dyn JobBackend>, config: PollConfig, renderer: PreviewRenderer) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            poller: Poller::new(Arc::clone(&backend), config),
            backend,
            shared: Arc::new(Shared {
                session,
                renderer,
                shut_down: CancellationToken::new(),
            }),
        }
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.session.subscribe()
    }

    /// Copy of the current session.
    pub fn session(&self) -> Session {
        self.shared.session.borrow().clone()
    }

    pub fn state(&self) -> GenerationState {
        self.shared.session.borrow().state
    }

    /// Whether a status poll is currently running.
    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    /// Number of poll timers created so far.
    pub fn timers_started(&self) -> usize {
        self.poller.timers_started()
    }

    /// Validate and submit a new generation.
    ///
    /// Returns `Ok(None)` without doing anything while a generation is
    /// already submitting or processing. Validation errors leave the
    /// session untouched. A failed start moves the session to `error` with
    /// the server's message and returns the same error.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Option<JobId>, SessionError> {
        let request = request.normalized();
        request.check().map_err(SessionError::Validation)?;

        let Some(epoch) = self.begin_submit()? else {
            tracing::debug!("Generation already in progress; submit ignored");
            return Ok(None);
        };
        self.poller.cancel();

        tracing::info!(service_name = %request.service_name, "Submitting generation request");
        let started = self.backend.start(&request).await;
        self.accept_start(epoch, started).map(Some)
    }

    /// Re-run the failed job. The backend assigns a new job id, which
    /// replaces the old one.
    pub async fn retry(&self) -> Result<Option<JobId>, SessionError> {
        let Some((epoch, previous)) = self.begin_retry()? else {
            tracing::debug!("Generation already in progress; retry ignored");
            return Ok(None);
        };
        self.poller.cancel();

        tracing::info!(job_id = %previous, "Retrying job");
        let retried = self.backend.retry(&previous).await;
        self.accept_start(epoch, retried).map(Some)
    }

    /// Follow a job that was started elsewhere, e.g. by an earlier run.
    ///
    /// Same state rules as [`submit`](Self::submit) without the start
    /// request.
    pub fn follow(&self, job_id: &str) -> Result<Option<JobId>, SessionError> {
        let Some(epoch) = self.begin_submit()? else {
            tracing::debug!(job_id, "Generation already in progress; follow ignored");
            return Ok(None);
        };
        self.poller.cancel();
        self.accept_start(epoch, Ok(job_id.to_string())).map(Some)
    }

    /// Return to a fresh idle session from `completed` or `error`.
    ///
    /// The poll is cancelled and the epoch bumped before this returns.
    pub fn reset(&self) -> Result<(), SessionError> {
        let mut outcome: Result<(), SessionError> = Ok(());
        self.shared.session.send_if_modified(|session| {
            if self.shared.is_shut_down() {
                outcome = Err(SessionError::ShutDown);
                return false;
            }
            if let Err(e) = session.state.transition(GenerationState::Idle) {
                outcome = Err(e.into());
                return false;
            }
            session.clear();
            true
        });
        outcome?;

        self.poller.cancel();
        tracing::info!("Session reset");
        Ok(())
    }

    /// Download the generated bundle of the completed job.
    pub async fn download(&self) -> Result<Vec<u8>, SessionError> {
        let job_id = self.completed_job_id()?;
        let bytes = self.backend.download(&job_id).await?;
        tracing::info!(job_id = %job_id, bytes = bytes.len(), "Bundle downloaded");
        Ok(bytes)
    }

    /// Download the bundle and save it as `dir/lp-{jobId}.zip`.
    pub async fn download_to(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let job_id = self.completed_job_id()?;
        let bytes = self.backend.download(&job_id).await?;
        Ok(save_bundle(dir, &job_id, &bytes).await?)
    }

    /// Wait until the session leaves `submitting`/`processing`, or until
    /// the controller is shut down. Shutdown freezes the session, so the
    /// returned copy may still be busy in that case.
    pub async fn settled(&self) -> Session {
        let mut receiver = self.subscribe();
        let settled = tokio::select! {
            biased;
            _ = self.shared.shut_down.cancelled() => None,
            changed = receiver.wait_for(|session| !session.state.is_busy()) => {
                changed.ok().map(|session| Session::clone(&session))
            }
        };
        settled.unwrap_or_else(|| self.session())
    }

    /// Stop polling and freeze the session. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let mut first = false;
        // Set under the session lock so an in-flight update either lands
        // before this or sees the flag.
        self.shared.session.send_if_modified(|_| {
            first = !self.shared.shut_down.is_cancelled();
            self.shared.shut_down.cancel();
            false
        });
        self.poller.cancel();
        if first {
            tracing::info!("Generation controller shut down");
        }
    }

    fn begin_submit(&self) -> Result<Option<u64>, SessionError> {
        let mut outcome: Result<Option<u64>, SessionError> = Ok(None);
        self.shared.session.send_if_modified(|session| {
            if self.shared.is_shut_down() {
                outcome = Err(SessionError::ShutDown);
                return false;
            }
            if session.state.is_busy() {
                return false;
            }
            match session.state.transition(GenerationState::Submitting) {
                Ok(next) => {
                    session.clear();
                    session.state = next;
                    outcome = Ok(Some(session.epoch));
                    true
                }
                Err(e) => {
                    outcome = Err(e.into());
                    false
                }
            }
        });
        outcome
    }

    fn begin_retry(&self) -> Result<Option<(u64, JobId)>, SessionError> {
        let mut outcome: Result<Option<(u64, JobId)>, SessionError> = Ok(None);
        self.shared.session.send_if_modified(|session| {
            if self.shared.is_shut_down() {
                outcome = Err(SessionError::ShutDown);
                return false;
            }
            if session.state.is_busy() {
                return false;
            }
            let next = match session.state.transition(GenerationState::Submitting) {
                Ok(next) => next,
                Err(e) => {
                    outcome = Err(e.into());
                    return false;
                }
            };
            let Some(previous) = session.job_id.clone() else {
                outcome = Err(SessionError::NoJob);
                return false;
            };

            session.clear();
            session.state = next;
            session.job_id = Some(previous.clone());
            outcome = Ok(Some((session.epoch, previous)));
            true
        });
        outcome
    }

    /// Apply the outcome of a start or retry call and begin polling.
    fn accept_start(
        &self,
        epoch: u64,
        started: Result<JobId, ApiError>,
    ) -> Result<JobId, SessionError> {
        let job_id = match started {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start generation");
                self.shared.session.send_if_modified(|session| {
                    if self.shared.is_shut_down() || session.epoch != epoch {
                        return false;
                    }
                    advance(session, GenerationState::Error);
                    session.error = Some(e.to_string());
                    true
                });
                return Err(e.into());
            }
        };

        let mut applied = false;
        self.shared.session.send_if_modified(|session| {
            if self.shared.is_shut_down() || session.epoch != epoch {
                return false;
            }
            advance(session, GenerationState::Processing);
            session.job_id = Some(job_id.clone());
            applied = true;
            true
        });
        if !applied {
            tracing::warn!(job_id = %job_id, "Job started after shutdown; not following it");
            return Err(SessionError::ShutDown);
        }

        tracing::info!(job_id = %job_id, "Generation started");
        self.start_polling(epoch, &job_id);
        Ok(job_id)
    }

    fn start_polling(&self, epoch: u64, job_id: &str) {
        let shared = Arc::clone(&self.shared);
        let started = self
            .poller
            .start(job_id, move |event| shared.apply(epoch, event));
        // A concurrent shutdown may have cancelled before the poll existed.
        if started && self.shared.is_shut_down() {
            self.poller.cancel();
        }
    }

    fn completed_job_id(&self) -> Result<JobId, SessionError> {
        let session = self.shared.session.borrow();
        if session.state != GenerationState::Completed {
            return Err(SessionError::NotCompleted);
        }
        session.job_id.clone().ok_or(SessionError::NoJob)
    }
}

impl Drop for GenerationController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
