//! Recoverable step faults
//!
//! None of these end a run. Each is rendered into an observation so the
//! model can correct itself on the next step.

use thiserror::Error;

use crate::tools::ArgumentMismatch;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepFault {
    #[error("Error: your reply did not follow the required format. {0}")]
    Parse(String),

    #[error("Error: undefined tool '{name}'. Available tools: {available}.")]
    UnknownTool { name: String, available: String },

    #[error("Error: arguments for tool '{tool}' do not match its parameters. {mismatch}")]
    ArgumentMismatch {
        tool: String,
        mismatch: ArgumentMismatch,
    },

    #[error("Error: tool '{tool}' failed: {message}")]
    Handler { tool: String, message: String },

    #[error("Error: the model call failed: {0}")]
    Transport(String),
}

impl StepFault {
    /// Faults that mean the step produced nothing usable. These count toward
    /// the consecutive-fault cap.
    pub fn is_unproductive(&self) -> bool {
        matches!(self, StepFault::Parse(_) | StepFault::Transport(_))
    }
}
