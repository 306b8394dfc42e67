//! Job status snapshots as reported by the generation backend.
//!
//! The client never computes step transitions itself: every field here is
//! taken from a server snapshot. The only client-side logic is derived
//! progress for display and [`reconcile_steps`], which refuses per-step
//! regressions.

use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the backend.
pub type JobId = String;

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Overall status of a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// `true` once the job will not change any more.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One phase of the generation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Wireframe,
    Css,
    Js,
    Image,
    ApplyImage,
}

impl StepId {
    /// All steps in pipeline order.
    pub const SEQUENCE: [StepId; 5] = [
        StepId::Wireframe,
        StepId::Css,
        StepId::Js,
        StepId::Image,
        StepId::ApplyImage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wireframe => "wireframe",
            Self::Css => "css",
            Self::Js => "js",
            Self::Image => "image",
            Self::ApplyImage => "apply-image",
        }
    }

    /// Display name shown before the server provides its own.
    pub fn label(self) -> &'static str {
        match self {
            Self::Wireframe => "Wireframe",
            Self::Css => "Design",
            Self::Js => "Interactions",
            Self::Image => "Image generation",
            Self::ApplyImage => "Image placement",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Wireframe => "Generate the HTML structure",
            Self::Css => "Generate the CSS styles",
            Self::Js => "Implement the JavaScript behaviour",
            Self::Image => "Generate images with AI",
            Self::ApplyImage => "Apply the generated images",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StepStatus {
    /// Forward rank. A step only ever moves to an equal or higher rank,
    /// except that `completed` is final.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Error => 2,
            Self::Completed => 3,
        }
    }
}

/// A named phase of the pipeline with its own progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: StepStatus,
    /// Sub-progress, 0-100.
    #[serde(default)]
    pub progress: f32,
}

impl Step {
    /// A fresh `pending` step with zero progress.
    pub fn pending(id: StepId) -> Self {
        Self {
            id,
            name: id.label().to_string(),
            description: id.description().to_string(),
            status: StepStatus::Pending,
            progress: 0.0,
        }
    }

    /// The five pipeline steps, all pending. Used before the first
    /// snapshot arrives and after a reset.
    pub fn initial_sequence() -> Vec<Step> {
        StepId::SEQUENCE.into_iter().map(Step::pending).collect()
    }
}

// ---------------------------------------------------------------------------
// Result and snapshot
// ---------------------------------------------------------------------------

/// The generated bundle of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub html: String,
    pub css: String,
    pub js: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Inline image as a `data:` URL; the backend sends `""` when it has
    /// none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    /// ISO-8601 creation time as sent by the backend (no timezone).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl GenerationResult {
    /// The image to show in place of the pipeline's placeholder file:
    /// the inline data URL when present, else the first image URL.
    pub fn image_source(&self) -> Option<&str> {
        self.image_base64
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.image_urls
                    .iter()
                    .map(String::as_str)
                    .find(|s| !s.is_empty())
            })
    }
}

/// One status report for a job, as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f32,
    /// Step id, `"completed"` or `""` depending on the phase.
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
}

impl JobSnapshot {
    /// Overall progress clamped to 0-100.
    pub fn progress_percent(&self) -> f32 {
        clamp_percent(self.progress)
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// Derived progress
// ---------------------------------------------------------------------------

/// Index of the step currently being worked on.
///
/// The first `processing` step wins; otherwise the step after the last
/// `completed` one (which may equal `steps.len()` when all are done);
/// otherwise 0.
pub fn current_step_index(steps: &[Step]) -> usize {
    if let Some(i) = steps.iter().position(|s| s.status == StepStatus::Processing) {
        return i;
    }
    steps
        .iter()
        .rposition(|s| s.status == StepStatus::Completed)
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Overall completion derived from the steps, 0-100.
///
/// Each step is an equal share; the processing step contributes its
/// share scaled by its own progress.
pub fn overall_progress(steps: &[Step]) -> f32 {
    if steps.is_empty() {
        return 0.0;
    }
    let total = steps.len() as f32;
    let completed = steps
        .iter()
        .filter(|s| s.status == StepStatus::Completed)
        .count() as f32;

    let mut progress = completed / total * 100.0;
    if let Some(step) = steps.iter().find(|s| s.status == StepStatus::Processing) {
        progress += clamp_percent(step.progress) / total;
    }
    clamp_percent(progress)
}

/// Merge a server snapshot's steps into the previously observed ones.
///
/// The incoming list is authoritative except for regressions: a step that
/// was `completed` and comes back with any other status keeps its
/// previous value.
pub fn reconcile_steps(previous: &[Step], incoming: Vec<Step>) -> Vec<Step> {
    incoming
        .into_iter()
        .map(|step| {
            let Some(prev) = previous.iter().find(|p| p.id == step.id) else {
                return step;
            };
            if prev.status == StepStatus::Completed && step.status != StepStatus::Completed {
                tracing::warn!(
                    step = %step.id,
                    status = ?step.status,
                    "Ignoring regression of a completed step",
                );
                return prev.clone();
            }
            if step.status.rank() < prev.status.rank() {
                tracing::debug!(step = %step.id, "Step status moved backwards");
            }
            step
        })
        .collect()
}
