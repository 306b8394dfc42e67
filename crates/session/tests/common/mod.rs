//! Scripted [`JobBackend`] for controller and poller tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lpgen_client::{ApiError, JobBackend};
use lpgen_core::{
    GenerationRequest, GenerationResult, JobId, JobSnapshot, JobStatus, Step, StepId, StepStatus,
};
use lpgen_preview::PreviewRenderer;
use lpgen_session::{GenerationController, PollConfig};

pub const ZIP_BYTES: &[u8] = b"PK\x03\x04scripted-bundle";

/// A scripted reply: a value or an HTTP failure.
pub type Reply<T> = Result<T, (u16, String)>;

fn to_api<T>(reply: Reply<T>) -> Result<T, ApiError> {
    reply.map_err(|(status, message)| ApiError::Api { status, message })
}

/// Backend that answers from queues. The last queued status reply repeats
/// once the queue is down to one entry.
#[derive(Default)]
pub struct ScriptedBackend {
    starts: Mutex<VecDeque<Reply<JobId>>>,
    retries: Mutex<VecDeque<Reply<JobId>>>,
    statuses: Mutex<VecDeque<Reply<JobSnapshot>>>,
    start_delay: Mutex<Option<Duration>>,
    pub start_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub retried: Mutex<Vec<JobId>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_statuses(statuses: Vec<Reply<JobSnapshot>>) -> Arc<Self> {
        let backend = Self::default();
        *backend.statuses.lock().unwrap() = statuses.into();
        Arc::new(backend)
    }

    pub fn push_start(&self, reply: Reply<JobId>) {
        self.starts.lock().unwrap().push_back(reply);
    }

    pub fn push_retry(&self, reply: Reply<JobId>) {
        self.retries.lock().unwrap().push_back(reply);
    }

    pub fn push_status(&self, reply: Reply<JobSnapshot>) {
        self.statuses.lock().unwrap().push_back(reply);
    }

    /// Hold every start call for `delay` before answering.
    pub fn delay_starts(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = Some(delay);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn start(&self, _request: &GenerationRequest) -> Result<JobId, ApiError> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.start_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .starts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("job-{n}")));
        to_api(reply)
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let reply = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        let reply = reply.unwrap_or_else(|| Ok(processing(job_id, StepId::Wireframe, 0.0)));
        to_api(reply)
    }

    async fn retry(&self, job_id: &str) -> Result<JobId, ApiError> {
        self.retried.lock().unwrap().push(job_id.to_string());
        let n = self.retried.lock().unwrap().len();
        let reply = self
            .retries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("retry-{n}")));
        to_api(reply)
    }

    async fn download(&self, _job_id: &str) -> Result<Vec<u8>, ApiError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ZIP_BYTES.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn easy_speak() -> GenerationRequest {
    GenerationRequest {
        service_name: "EasySpeak".into(),
        service_type: "オンライン英会話スクール".into(),
        target_audience: "社会人向け".into(),
        features: "24時間対応、パーソナルカリキュラム".into(),
        testimonials: "講師情報、お客様の声".into(),
        company_name: "株式会社アブソリュート".into(),
    }
}

/// Poll settings used by the tests: 3 s interval, 5 failures, 10 minutes.
pub fn poll_config() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(3),
        max_consecutive_failures: Some(5),
        max_duration: Some(Duration::from_secs(600)),
    }
}

pub fn controller(backend: Arc<ScriptedBackend>, config: PollConfig) -> GenerationController {
    GenerationController::new(backend, config, PreviewRenderer::default())
}

/// Steps with `current` processing at `progress` and everything before it
/// completed.
pub fn steps_at(current: StepId, progress: f32) -> Vec<Step> {
    StepId::SEQUENCE
        .into_iter()
        .map(|id| {
            let (status, progress) = if id < current {
                (StepStatus::Completed, 100.0)
            } else if id == current {
                (StepStatus::Processing, progress)
            } else {
                (StepStatus::Pending, 0.0)
            };
            Step {
                status,
                progress,
                ..Step::pending(id)
            }
        })
        .collect()
}

pub fn processing(job_id: &str, step: StepId, progress: f32) -> JobSnapshot {
    JobSnapshot {
        job_id: job_id.to_string(),
        status: JobStatus::Processing,
        progress: 0.0,
        current_step: step.as_str().to_string(),
        steps: steps_at(step, progress),
        error: None,
        result: None,
    }
}

pub fn result(headline: &str) -> GenerationResult {
    GenerationResult {
        job_id: None,
        html: format!("<section class=\"hero\"><h1>{headline}</h1></section>"),
        css: ".hero { background-image: url('placeholder_css_1.jpg'); }".into(),
        js: "console.log('ready');".into(),
        image_urls: vec![],
        image_base64: Some("data:image/jpeg;base64,/9j/4AAQ".into()),
        preview_url: None,
        created_at: Some("2025-03-01T12:00:00".into()),
    }
}

pub fn completed(job_id: &str, result: Option<GenerationResult>) -> JobSnapshot {
    JobSnapshot {
        job_id: job_id.to_string(),
        status: JobStatus::Completed,
        progress: 100.0,
        current_step: "completed".into(),
        steps: StepId::SEQUENCE
            .into_iter()
            .map(|id| Step {
                status: StepStatus::Completed,
                progress: 100.0,
                ..Step::pending(id)
            })
            .collect(),
        error: None,
        result,
    }
}

pub fn failed(job_id: &str, error: Option<&str>) -> JobSnapshot {
    JobSnapshot {
        job_id: job_id.to_string(),
        status: JobStatus::Error,
        progress: 20.0,
        current_step: StepId::Css.as_str().to_string(),
        steps: steps_at(StepId::Css, 0.0),
        error: error.map(str::to_string),
        result: None,
    }
}
