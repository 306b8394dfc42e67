//! Generation lifecycle state machine.
//!
//! ```text
//! idle ──> submitting ──> processing ──> completed ──> idle
//!   ^          │              │
//!   │          v              v
//!   └──────── error <─────────┘
//!              │
//!              └──> submitting (retry)
//! ```

/// Lifecycle state of the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GenerationState {
    #[default]
    Idle,
    Submitting,
    Processing,
    Completed,
    Error,
}

/// Rejected state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: GenerationState,
        to: GenerationState,
    },
}

impl GenerationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether the state machine allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, to),
            (Idle, Submitting)
                | (Submitting, Processing)
                | (Submitting, Error)
                | (Processing, Completed)
                | (Processing, Error)
                | (Completed, Idle)
                | (Error, Idle)
                | (Error, Submitting)
        )
    }

    /// Validate a transition and return the new state.
    pub fn transition(self, to: GenerationState) -> Result<GenerationState, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError::InvalidTransition { from: self, to })
        }
    }

    /// A request is in flight or a job is running.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Submitting | Self::Processing)
    }

    /// The lifecycle has settled and waits for a user action.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
