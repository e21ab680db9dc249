//! Reactant agent core
//!
//! A ReAct loop: the model thinks, picks one action, a tool runs, and the
//! result is fed back as an observation until the model finishes or the
//! step budget runs out.

use thiserror::Error;

pub mod context;
pub mod fault;
pub mod loop_agent;
pub mod parser;
pub mod retry;
pub mod state;
pub mod tools;

pub use context::ContextBuilder;
pub use fault::StepFault;
pub use loop_agent::{AgentLoop, AgentOptions};
pub use parser::{Action, OutputParser, ParsedStep};
pub use retry::RetryPolicy;
pub use state::{Role, RunOutcome, RunReport, RunState, Turn};
pub use tools::{
    register_command_tools, ArgumentMismatch, Arguments, CommandTool, ParamSpec, Signature,
    ToolError, ToolHandler, ToolRegistry,
};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("tool timed out after {0}s")]
    ToolTimeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
