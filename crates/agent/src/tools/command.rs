//! Tools backed by shell commands
//!
//! Each validated argument is exported to the command as `ARG_<NAME>`;
//! absent optional parameters get their declared default.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use reactant_config::CommandToolConfig;

use super::{Arguments, Signature, ToolError, ToolHandler, ToolRegistry};
use crate::AgentError;

const MAX_OUTPUT_LEN: usize = 10_000;

/// Environment variable carrying a parameter's value
pub fn env_var_name(param: &str) -> String {
    let upper: String = param
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("ARG_{}", upper)
}

/// Shell command tool
pub struct CommandTool {
    command: String,
    signature: Signature,
    timeout_secs: u64,
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    pub fn new(command: impl Into<String>, signature: Signature) -> Self {
        Self {
            command: command.into(),
            signature,
            timeout_secs: 30,
            working_dir: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn from_config(config: &CommandToolConfig) -> Self {
        Self::new(&config.command, Signature::from(config.params.as_slice()))
            .with_timeout(config.timeout_secs)
    }
}

#[async_trait]
impl ToolHandler for CommandTool {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn call(&self, args: Arguments) -> Result<String, ToolError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for param in self.signature.params() {
            if let Some(value) = self.signature.value_or_default(&args, &param.name) {
                cmd.env(env_var_name(&param.name), value);
            }
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("running command tool: {}", self.command);
        let output = match tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            cmd.output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AgentError::ToolExecution(e.to_string()).into()),
            Err(_) => return Err(AgentError::ToolTimeout(self.timeout_secs).into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::ToolExecution(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.len() > MAX_OUTPUT_LEN {
            let mut cut = MAX_OUTPUT_LEN;
            while !stdout.is_char_boundary(cut) {
                cut -= 1;
            }
            Ok(format!(
                "{}\n(output truncated, {} bytes omitted)",
                &stdout[..cut],
                stdout.len() - cut
            ))
        } else {
            Ok(stdout)
        }
    }
}

/// Register every configured command tool
pub fn register_command_tools(registry: &mut ToolRegistry, tools: &[CommandToolConfig]) {
    for tool in tools {
        registry.register(
            &tool.name,
            tool.description.clone(),
            CommandTool::from_config(tool),
        );
    }
}
