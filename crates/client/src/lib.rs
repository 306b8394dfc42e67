//! HTTP client for the landing-page generation API.
//!
//! [`LpApi`] maps the REST endpoints (start, status, retry, download,
//! list) onto typed calls. The [`JobBackend`] trait is the seam the
//! session controller depends on, so tests can substitute a scripted
//! backend.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;

pub use api::LpApi;
pub use backend::JobBackend;
pub use config::ClientConfig;
pub use error::ApiError;
