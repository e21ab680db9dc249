//! Run state: conversation turns, step accounting and the final report

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;

use reactant_provider::Message;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Observation,
}

/// One entry of the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::new(Role::Observation, content)
    }

    /// Chat message for this turn. Chat APIs have no observation role, so
    /// observations go out as user messages.
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::System => Message::system(&self.content),
            Role::User => Message::user(&self.content),
            Role::Assistant => Message::assistant(&self.content),
            Role::Observation => Message::user(format!("Observation: {}", self.content)),
        }
    }
}

/// State of one run. Never shared between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub step_index: u32,
    pub max_steps: u32,
    pub history: Vec<Turn>,
    pub terminated: bool,
    pub result: Option<String>,
    /// Parse/transport faults since the last productive step
    #[serde(skip)]
    pub consecutive_faults: u32,
}

impl RunState {
    /// Fresh state whose history holds only the question
    pub fn new(question: impl Into<String>, max_steps: u32) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            step_index: 0,
            max_steps,
            history: vec![Turn::user(question)],
            terminated: false,
            result: None,
            consecutive_faults: 0,
        }
    }

    pub fn has_budget(&self) -> bool {
        !self.terminated && self.step_index < self.max_steps
    }

    /// Start the next step and return its 1-based index
    pub fn begin_step(&mut self) -> u32 {
        debug_assert!(self.step_index < self.max_steps);
        self.step_index += 1;
        self.step_index
    }

    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// The user's question
    pub fn question(&self) -> &str {
        self.history
            .iter()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("")
    }

    pub fn finish(&mut self, answer: impl Into<String>) {
        self.terminated = true;
        self.result = Some(answer.into());
    }

    pub fn stop(&mut self) {
        self.terminated = true;
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum RunOutcome {
    /// The model gave a final answer
    Finished(String),
    /// The step budget ran out
    Exhausted,
    /// Too many consecutive unproductive steps
    Aborted(String),
}

/// Result of [`crate::AgentLoop::run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub state: RunState,
}

impl RunReport {
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Finished(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.outcome, RunOutcome::Finished(_))
    }

    pub fn steps(&self) -> u32 {
        self.state.step_index
    }

    pub fn history(&self) -> &[Turn] {
        &self.state.history
    }

    /// Write the report as pretty JSON
    pub async fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_holds_question() {
        let state = RunState::new("weather in Beijing?", 3);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].role, Role::User);
        assert_eq!(state.question(), "weather in Beijing?");
        assert!(state.has_budget());
        assert!(state.result.is_none());
    }

    #[test]
    fn test_budget_runs_out() {
        let mut state = RunState::new("q", 2);
        assert_eq!(state.begin_step(), 1);
        assert_eq!(state.begin_step(), 2);
        assert!(!state.has_budget());
        assert!(state.step_index <= state.max_steps);
    }

    #[test]
    fn test_finish_terminates() {
        let mut state = RunState::new("q", 5);
        state.begin_step();
        state.finish("42");
        assert!(state.terminated);
        assert!(!state.has_budget());
        assert_eq!(state.result.as_deref(), Some("42"));
    }

    #[test]
    fn test_observation_becomes_user_message() {
        let msg = Turn::observation("Sunny, 25C").to_message();
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Observation: Sunny, 25C");

        let msg = Turn::assistant("Action: Finish[x]").to_message();
        assert_eq!(msg.role, "assistant");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&RunOutcome::Finished("ok".into())).unwrap();
        assert_eq!(json, r#"{"status":"finished","detail":"ok"}"#);
        let json = serde_json::to_string(&RunOutcome::Exhausted).unwrap();
        assert_eq!(json, r#"{"status":"exhausted"}"#);
    }
}
