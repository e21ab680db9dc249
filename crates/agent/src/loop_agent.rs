//! Agent loop - Thought/Action/Observation cycle

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use reactant_config::{Config, MultiActionPolicy, PromptMode};
use reactant_provider::{ChatParams, Message, Provider, ProviderError};

use crate::context::ContextBuilder;
use crate::fault::StepFault;
use crate::parser::{Action, OutputParser};
use crate::retry::RetryPolicy;
use crate::state::{RunOutcome, RunReport, RunState, Turn};
use crate::tools::{Arguments, ToolRegistry};

/// Generation stops before the model invents its own observation
pub const STOP_SEQUENCE: &str = "\nObservation:";

const NO_OUTPUT: &str = "(no output)";

/// Parameters of a run
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Model id; empty means the provider's default
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_steps: u32,
    /// Consecutive parse/transport faults before aborting (0 = never)
    pub max_consecutive_faults: u32,
    pub multi_action: MultiActionPolicy,
    pub prompt_mode: PromptMode,
    pub retry: RetryPolicy,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.0,
            max_tokens: 1024,
            max_steps: 5,
            max_consecutive_faults: 3,
            multi_action: MultiActionPolicy::default(),
            prompt_mode: PromptMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model(),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
            max_steps: config.agent.max_steps,
            max_consecutive_faults: config.agent.max_consecutive_faults,
            multi_action: config.agent.multi_action,
            prompt_mode: config.agent.prompt_mode,
            retry: RetryPolicy::from(&config.agent.retry),
        }
    }

    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_max_consecutive_faults(mut self, max: u32) -> Self {
        self.max_consecutive_faults = max;
        self
    }

    pub fn with_multi_action(mut self, policy: MultiActionPolicy) -> Self {
        self.multi_action = policy;
        self
    }

    pub fn with_prompt_mode(mut self, mode: PromptMode) -> Self {
        self.prompt_mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Drives one question to a final answer or to the end of its step budget.
///
/// The loop itself holds no per-run state, so one instance can serve
/// concurrent runs; each [`AgentLoop::run`] call gets a fresh [`RunState`].
pub struct AgentLoop<P: Provider> {
    provider: Arc<P>,
    tools: Arc<ToolRegistry>,
    options: AgentOptions,
    parser: OutputParser,
    context: ContextBuilder,
}

impl<P: Provider> AgentLoop<P> {
    pub fn new(provider: P, tools: ToolRegistry, options: AgentOptions) -> Self {
        Self::with_shared(Arc::new(provider), Arc::new(tools), options)
    }

    /// Create a loop over a provider and registry shared with other loops
    pub fn with_shared(provider: Arc<P>, tools: Arc<ToolRegistry>, options: AgentOptions) -> Self {
        Self {
            parser: OutputParser::new(options.multi_action),
            context: ContextBuilder::new(options.prompt_mode),
            provider,
            tools,
            options,
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one question
    pub async fn run(&self, question: &str) -> RunReport {
        let state = RunState::new(question, self.options.max_steps);
        let span = info_span!("run", run_id = %state.run_id);
        self.drive(state).instrument(span).await
    }

    async fn drive(&self, mut state: RunState) -> RunReport {
        info!(
            "starting run: max_steps={}, tools={}",
            state.max_steps,
            self.tools.len()
        );
        let catalog = self.tools.describe();

        while state.has_budget() {
            let step = state.begin_step();
            debug!("step {}/{}", step, state.max_steps);

            let messages = self.context.build_messages(&catalog, &state.history);
            let reply = match self.think(messages).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("model call failed at step {}: {}", step, e);
                    match self.record_fault(&mut state, StepFault::Transport(e.to_string())) {
                        Some(report) => return report,
                        None => continue,
                    }
                }
            };

            let parsed = self.parser.parse(&reply);
            if let Some(thought) = &parsed.thought {
                debug!("thought: {}", thought);
            }
            state.push(Turn::assistant(parsed.text));

            match parsed.action {
                Action::Finish { answer } => {
                    info!("finished after {} steps", step);
                    state.finish(answer.clone());
                    return RunReport {
                        outcome: RunOutcome::Finished(answer),
                        state,
                    };
                }
                Action::Malformed { reason } => {
                    debug!("malformed reply: {}", reason);
                    if let Some(report) = self.record_fault(&mut state, StepFault::Parse(reason)) {
                        return report;
                    }
                }
                Action::ToolCall { name, arguments } => {
                    state.consecutive_faults = 0;
                    let observation = match self.dispatch(&name, arguments).await {
                        Ok(output) if output.trim().is_empty() => NO_OUTPUT.to_string(),
                        Ok(output) => output,
                        Err(fault) => {
                            warn!("{}", fault);
                            fault.to_string()
                        }
                    };
                    state.push(Turn::observation(observation));
                }
            }
        }

        info!("step budget of {} exhausted without an answer", state.max_steps);
        state.stop();
        RunReport {
            outcome: RunOutcome::Exhausted,
            state,
        }
    }

    /// One model call, retried on transient failures
    async fn think(&self, messages: Vec<Message>) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            let params = ChatParams {
                model: self.options.model.clone(),
                messages: messages.clone(),
                max_tokens: self.options.max_tokens,
                temperature: self.options.temperature,
                stop: vec![STOP_SEQUENCE.to_string()],
            };

            match self.provider.generate(params).await {
                Ok(reply) => return Ok(reply),
                Err(e) if self.options.retry.should_retry(&e, attempt) => {
                    let delay = self.options.retry.backoff(attempt);
                    warn!("model call failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Record a fault as an observation. Returns a report when the run has
    /// gone too many steps without a usable action.
    fn record_fault(&self, state: &mut RunState, fault: StepFault) -> Option<RunReport> {
        state.push(Turn::observation(fault.to_string()));
        if !fault.is_unproductive() {
            return None;
        }

        state.consecutive_faults += 1;
        let cap = self.options.max_consecutive_faults;
        if cap == 0 || state.consecutive_faults < cap {
            return None;
        }

        warn!("aborting after {} consecutive faults", state.consecutive_faults);
        state.stop();
        Some(RunReport {
            outcome: RunOutcome::Aborted(format!(
                "{} consecutive steps without a usable action; last: {}",
                state.consecutive_faults, fault
            )),
            state: state.clone(),
        })
    }

    /// Look up, validate and invoke a tool. Every failure comes back as a
    /// [`StepFault`], including a panicking handler.
    pub async fn dispatch(&self, name: &str, arguments: Arguments) -> Result<String, StepFault> {
        let tool = self.tools.get(name).ok_or_else(|| StepFault::UnknownTool {
            name: name.to_string(),
            available: self.available_tools(),
        })?;

        let args = tool
            .signature()
            .validate(&arguments)
            .map_err(|mismatch| StepFault::ArgumentMismatch {
                tool: tool.name().to_string(),
                mismatch,
            })?;

        debug!("calling tool '{}' with {:?}", tool.name(), args);
        let handler = Arc::clone(tool.handler());
        match AssertUnwindSafe(handler.call(args)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(StepFault::Handler {
                tool: tool.name().to_string(),
                message: e.to_string(),
            }),
            Err(panic) => Err(StepFault::Handler {
                tool: tool.name().to_string(),
                message: format!("panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    fn available_tools(&self) -> String {
        if self.tools.is_empty() {
            "(none)".to_string()
        } else {
            self.tools.names().join(", ")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
