//! REST client for the generation API.
//!
//! Wraps the HTTP endpoints (job start, status, retry, download and
//! listing) using [`reqwest`].

use async_trait::async_trait;
use lpgen_core::{GenerationRequest, JobId, JobSnapshot};
use serde::Deserialize;

use crate::backend::JobBackend;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// HTTP client for one generation API deployment.
#[derive(Debug, Clone)]
pub struct LpApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response of the endpoints that create a job (`/generate`, `/retry`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobCreated {
    job_id: JobId,
}

/// Response of `GET /jobs`.
#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<JobSnapshot>,
}

/// Error body fields the backend may use, in order of preference.
const ERROR_MESSAGE_FIELDS: &[&str] = &["message", "detail", "error"];

impl LpApi {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.api_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a generation job.
    ///
    /// Sends `POST /generate` with the request as JSON and returns the
    /// server-assigned job id.
    pub async fn start_generation(&self, request: &GenerationRequest) -> Result<JobId, ApiError> {
        tracing::debug!(service_name = %request.service_name, "Starting generation");

        let result: Result<JobCreated, ApiError> = async {
            let response = self
                .client
                .post(self.endpoint(&["generate"])?)
                .json(request)
                .send()
                .await?;
            Self::parse_response::<JobCreated>(response).await
        }
        .await;

        match result {
            Ok(created) => {
                tracing::info!(job_id = %created.job_id, "Generation job started");
                Ok(created.job_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error starting generation");
                Err(e)
            }
        }
    }

    /// Fetch a job's status snapshot via `GET /jobs/{job_id}`.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        let result: Result<JobSnapshot, ApiError> = async {
            let response = self
                .client
                .get(self.endpoint(&["jobs", job_id])?)
                .send()
                .await?;
            Self::parse_response::<JobSnapshot>(response).await
        }
        .await;

        if let Err(e) = &result {
            tracing::error!(job_id, error = %e, "Error getting job status");
        }
        result
    }

    /// Re-run a job with its original inputs via `POST /jobs/{job_id}/retry`.
    ///
    /// Returns the id of the new job.
    pub async fn retry_job(&self, job_id: &str) -> Result<JobId, ApiError> {
        let result: Result<JobCreated, ApiError> = async {
            let response = self
                .client
                .post(self.endpoint(&["jobs", job_id, "retry"])?)
                .send()
                .await?;
            Self::parse_response::<JobCreated>(response).await
        }
        .await;

        match result {
            Ok(created) => {
                tracing::info!(job_id, new_job_id = %created.job_id, "Job retried");
                Ok(created.job_id)
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Error retrying job");
                Err(e)
            }
        }
    }

    /// Download the generated bundle via `GET /jobs/{job_id}/download`.
    ///
    /// Any non-2xx status is reported as [`ApiError::Download`].
    pub async fn download_results(&self, job_id: &str) -> Result<Vec<u8>, ApiError> {
        let result: Result<Vec<u8>, ApiError> = async {
            let response = self
                .client
                .get(self.endpoint(&["jobs", job_id, "download"])?)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Download {
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
        .await;

        match &result {
            Ok(bytes) => tracing::info!(job_id, size = bytes.len(), "Downloaded results"),
            Err(e) => tracing::error!(job_id, error = %e, "Error downloading results"),
        }
        result
    }

    /// List all jobs known to the backend, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobSnapshot>, ApiError> {
        let result: Result<JobList, ApiError> = async {
            let response = self
                .client
                .get(self.endpoint(&["jobs"])?)
                .send()
                .await?;
            Self::parse_response::<JobList>(response).await
        }
        .await;

        match result {
            Ok(list) => {
                tracing::debug!(count = list.jobs.len(), "Listed jobs");
                Ok(list.jobs)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error listing jobs");
                Err(e)
            }
        }
    }

    // ---- private helpers ----

    /// Append path segments to the base URL. Each segment is
    /// percent-encoded, so a job id cannot change the endpoint.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ensure the response has a success status code. On failure the body
    /// is read for a server-provided message.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobBackend for LpApi {
    async fn start(&self, request: &GenerationRequest) -> Result<JobId, ApiError> {
        self.start_generation(request).await
    }

    async fn status(&self, job_id: &str) -> Result<JobSnapshot, ApiError> {
        self.get_job_status(job_id).await
    }

    async fn retry(&self, job_id: &str) -> Result<JobId, ApiError> {
        self.retry_job(job_id).await
    }

    async fn download(&self, job_id: &str) -> Result<Vec<u8>, ApiError> {
        self.download_results(job_id).await
    }
}

/// Extract a user-facing message from an error body.
///
/// Uses the first non-empty string among the known message fields of a
/// JSON object body, else `"API error: {status}"`.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ERROR_MESSAGE_FIELDS.iter().find_map(|field| {
                value
                    .get(field)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| format!("API error: {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> LpApi {
        LpApi::with_client(reqwest::Client::new(), base)
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let api = api("http://localhost:8000/api/");
        assert_eq!(
            api.endpoint(&["jobs", "33fdab45", "retry"]).unwrap().as_str(),
            "http://localhost:8000/api/jobs/33fdab45/retry"
        );
    }

    #[test]
    fn endpoint_encodes_job_ids() {
        let api = api("http://localhost:8000/api");
        assert_eq!(
            api.endpoint(&["jobs", "abc/retry"]).unwrap().as_str(),
            "http://localhost:8000/api/jobs/abc%2Fretry"
        );
        assert_eq!(
            api.endpoint(&["jobs", "x?y", "download"]).unwrap().as_str(),
            "http://localhost:8000/api/jobs/x%3Fy/download"
        );
    }

    #[test]
    fn unparsable_base_url_is_reported() {
        let err = api("localhost:8000").endpoint(&["jobs"]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn message_field_is_preferred() {
        let body = r#"{"message":"quota exceeded","detail":"other"}"#;
        assert_eq!(error_message(500, body), "quota exceeded");
    }

    #[test]
    fn fastapi_detail_is_used() {
        assert_eq!(error_message(404, r#"{"detail":"Job not found"}"#), "Job not found");
    }

    #[test]
    fn unparsable_body_falls_back_to_status() {
        assert_eq!(error_message(502, "<html>Bad Gateway</html>"), "API error: 502");
        assert_eq!(error_message(500, ""), "API error: 500");
    }

    #[test]
    fn non_string_message_falls_back_to_status() {
        assert_eq!(error_message(400, r#"{"detail":[{"loc":["body"]}]}"#), "API error: 400");
        assert_eq!(error_message(400, r#"{"message":""}"#), "API error: 400");
    }
}
