//! In-process mock of the generation API for client integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Bytes served by the download endpoint of a completed job.
pub const ZIP_BYTES: &[u8] = b"PK\x03\x04mock-landing-page-bundle";

/// Number of status polls before a job reports `completed`.
pub const POLLS_UNTIL_COMPLETE: u32 = 3;

#[derive(Default)]
pub struct MockState {
    /// job id -> number of status requests served so far.
    pub polls: Mutex<HashMap<String, u32>>,
    /// Requests received by `/generate`, for body assertions.
    pub submitted: Mutex<Vec<Value>>,
}

pub type Shared = Arc<MockState>;

/// Start the mock API on an ephemeral port and return its base URL
/// (including the `/api` prefix).
pub async fn spawn_mock_api() -> (String, Shared) {
    let state: Shared = Arc::new(MockState::default());

    let router = Router::new()
        .route("/api/generate", post(generate))
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/{id}", get(job_status))
        .route("/api/jobs/{id}/retry", post(retry))
        .route("/api/jobs/{id}/download", get(download))
        .with_state(Arc::clone(&state));

    (serve(router).await, state)
}

/// Serve an arbitrary router on an ephemeral port.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{addr}/api")
}

async fn generate(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let job_id = uuid::Uuid::new_v4().to_string();
    state.submitted.lock().unwrap().push(body);
    state.polls.lock().unwrap().insert(job_id.clone(), 0);
    Json(json!({ "jobId": job_id }))
}

async fn job_status(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut polls = state.polls.lock().unwrap();
    let Some(count) = polls.get_mut(&id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Job not found" }))).into_response();
    };
    *count += 1;
    Json(snapshot(&id, *count)).into_response()
}

async fn retry(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut polls = state.polls.lock().unwrap();
    if !polls.contains_key(&id) {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Job not found" }))).into_response();
    }
    let new_id = uuid::Uuid::new_v4().to_string();
    polls.insert(new_id.clone(), 0);
    Json(json!({ "jobId": new_id })).into_response()
}

async fn download(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let polls = state.polls.lock().unwrap();
    match polls.get(&id) {
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Job not found" }))).into_response(),
        Some(count) if *count < POLLS_UNTIL_COMPLETE => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Job is not completed yet" })),
        )
            .into_response(),
        Some(_) => ([("content-type", "application/zip")], ZIP_BYTES).into_response(),
    }
}

async fn list_jobs(State(state): State<Shared>) -> Json<Value> {
    let polls = state.polls.lock().unwrap();
    let jobs: Vec<Value> = polls.iter().map(|(id, count)| snapshot(id, *count)).collect();
    Json(json!({ "jobs": jobs }))
}

/// Status payload after `count` polls: processing on the wireframe step
/// first, completed from [`POLLS_UNTIL_COMPLETE`] on.
pub fn snapshot(job_id: &str, count: u32) -> Value {
    if count >= POLLS_UNTIL_COMPLETE {
        return json!({
            "jobId": job_id,
            "status": "completed",
            "progress": 100,
            "currentStep": "completed",
            "steps": steps(5),
            "result": {
                "jobId": job_id,
                "html": "<section class=\"hero\"><h1>EasySpeak</h1></section>",
                "css": ".hero { background-image: url('placeholder_css_1.jpg'); }",
                "js": "document.querySelector('.hero').classList.add('ready');",
                "imageBase64": "data:image/jpeg;base64,/9j/4AAQ",
                "createdAt": "2025-03-01T12:00:00"
            }
        });
    }
    json!({
        "jobId": job_id,
        "status": "processing",
        "progress": 10,
        "currentStep": "wireframe",
        "steps": steps(0),
    })
}

fn steps(completed: usize) -> Vec<Value> {
    ["wireframe", "css", "js", "image", "apply-image"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let (status, progress) = if i < completed {
                ("completed", 100)
            } else if i == completed {
                ("processing", 50)
            } else {
                ("pending", 0)
            };
            json!({ "id": id, "name": id, "description": "", "status": status, "progress": progress })
        })
        .collect()
}
