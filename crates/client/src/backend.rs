use async_trait::async_trait;
use lpgen_core::{GenerationRequest, JobId, JobSnapshot};

use crate::error::ApiError;

/// Operations the session controller needs from the generation API.
///
/// Implemented by [`LpApi`](crate::LpApi) over HTTP. Tests implement it
/// with scripted responses.
#[async_trait]
pub trait JobBackend: Send + Sync + 'static {
    /// Start a new generation job and return its id.
    async fn start(&self, request: &GenerationRequest) -> Result<JobId, ApiError>;

    /// Fetch the current status snapshot of a job.
    async fn status(&self, job_id: &str) -> Result<JobSnapshot, ApiError>;

    /// Re-run a job with its original inputs. Returns the new job id.
    async fn retry(&self, job_id: &str) -> Result<JobId, ApiError>;

    /// Download the generated bundle (a zip archive).
    async fn download(&self, job_id: &str) -> Result<Vec<u8>, ApiError>;
}
