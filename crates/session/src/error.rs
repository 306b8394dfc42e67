use lpgen_client::ApiError;
use lpgen_core::CoreError;

use crate::state::TransitionError;

/// Errors returned by [`GenerationController`](crate::GenerationController)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request failed validation; the session was not touched.
    #[error(transparent)]
    Validation(CoreError),

    /// The backend rejected or failed the call. The session shows the same
    /// message.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("No job to act on")]
    NoJob,

    #[error("Generation has not completed")]
    NotCompleted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Controller has been shut down")]
    ShutDown,
}
