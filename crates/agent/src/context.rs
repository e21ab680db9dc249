//! Prompt assembly

use reactant_config::PromptMode;
use reactant_provider::Message;

use crate::state::{Role, Turn};

/// The tool-call form the parser accepts
pub const TOOL_CALL_FORM: &str = "tool_name(arg=\"value\")";
/// The finishing form the parser accepts
pub const FINISH_FORM: &str = "Finish[answer]";

const NO_TOOLS: &str = "(no tools available)";

/// Builds the outgoing message list for each step
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder {
    mode: PromptMode,
}

impl ContextBuilder {
    pub fn new(mode: PromptMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// System prompt for chat mode. `catalog` is the registry's
    /// `describe()` output and is embedded unchanged.
    pub fn system_prompt(&self, catalog: &str) -> String {
        format!(
            r#"You are an assistant that answers questions by reasoning step by step and calling tools.

## Available tools
{}

## Reply format
Each reply contains exactly one Thought and exactly one Action:

Thought: <your reasoning about what to do next>
Action: <one action>

The Action must be one of:
- {} to call a tool with string arguments
- {} when you know the final answer

After a tool call you will receive its result as an Observation. Do not write
Observations yourself. Reply with one Thought/Action pair at a time."#,
            catalog_or_placeholder(catalog),
            TOOL_CALL_FORM,
            FINISH_FORM
        )
    }

    /// Messages for the next model call
    pub fn build_messages(&self, catalog: &str, history: &[Turn]) -> Vec<Message> {
        match self.mode {
            PromptMode::Chat => {
                let mut messages = Vec::with_capacity(history.len() + 1);
                messages.push(Message::system(self.system_prompt(catalog)));
                messages.extend(history.iter().map(Turn::to_message));
                messages
            }
            PromptMode::Transcript => vec![Message::user(self.transcript_prompt(catalog, history))],
        }
    }

    /// Single prompt carrying the catalog, the question and every step so far
    pub fn transcript_prompt(&self, catalog: &str, history: &[Turn]) -> String {
        let question = history
            .iter()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("");

        let steps: Vec<String> = history
            .iter()
            .skip_while(|t| t.role != Role::User)
            .skip(1)
            .filter_map(|t| match t.role {
                Role::Assistant => Some(t.content.clone()),
                Role::Observation => Some(format!("Observation: {}", t.content)),
                Role::User | Role::System => None,
            })
            .collect();

        format!(
            r#"Answer the question below by reasoning step by step and calling tools.

Available tools:
{}

Use this format:
Thought: <your reasoning>
Action: <one action>

where the Action is either {} to call a tool or {} to give the final answer.
Write exactly one Thought/Action pair per reply.

Question: {}
History:
{}"#,
            catalog_or_placeholder(catalog),
            TOOL_CALL_FORM,
            FINISH_FORM,
            question,
            steps.join("\n")
        )
    }
}

fn catalog_or_placeholder(catalog: &str) -> &str {
    if catalog.trim().is_empty() {
        NO_TOOLS
    } else {
        catalog
    }
}
