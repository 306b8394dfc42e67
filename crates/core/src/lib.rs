//! Domain types for the landing-page generation client.
//!
//! Holds the request model with its validation rules, the job snapshot
//! model shared by the HTTP client and the session controller, and the
//! core error type. No I/O happens in this crate.

pub mod config;
pub mod error;
pub mod job;
pub mod request;

pub use error::CoreError;
pub use job::{GenerationResult, JobId, JobSnapshot, JobStatus, Step, StepId, StepStatus};
pub use request::GenerationRequest;
