//! Generation session: lifecycle state machine, status polling and the
//! controller that ties them to the job backend and preview renderer.

pub mod config;
pub mod controller;
pub mod error;
pub mod poller;
pub mod session;
pub mod state;

pub use config::PollConfig;
pub use controller::{bundle_file_name, save_bundle, GenerationController, UNKNOWN_ERROR};
pub use error::SessionError;
pub use poller::{PollError, PollEvent, Poller};
pub use session::Session;
pub use state::{GenerationState, TransitionError};
