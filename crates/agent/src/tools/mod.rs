//! Tool registry and the handler interface every tool implements

pub mod command;
pub mod signature;

pub use command::{register_command_tools, CommandTool};
pub use signature::{ArgumentMismatch, Arguments, ParamSpec, Signature};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error a tool handler may return
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

/// A callable tool. Receives validated string arguments, returns text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Declared parameters, checked before every call
    fn signature(&self) -> &Signature;

    async fn call(&self, args: Arguments) -> Result<String, ToolError>;
}

/// Handler backed by a plain closure
pub struct FnTool<F> {
    signature: Signature,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Arguments) -> Result<String, ToolError> + Send + Sync,
{
    pub fn new(signature: Signature, func: F) -> Self {
        Self { signature, func }
    }
}

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(&Arguments) -> Result<String, ToolError> + Send + Sync,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn call(&self, args: Arguments) -> Result<String, ToolError> {
        (self.func)(&args)
    }
}

/// A registered tool
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn signature(&self) -> &Signature {
        self.handler.signature()
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("signature", self.signature())
            .finish()
    }
}

/// Lookup key for a tool name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Tools keyed by normalized name, kept in registration order.
///
/// Mutated only while setting up; share it as `Arc<ToolRegistry>` once runs start.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. An existing tool with the same normalized name is
    /// replaced in place.
    pub fn register<H>(
        &mut self,
        name: impl AsRef<str>,
        description: impl Into<String>,
        handler: H,
    ) where
        H: ToolHandler + 'static,
    {
        let key = normalize_name(name.as_ref());
        let tool = Tool {
            name: key.clone(),
            description: description.into(),
            handler: Arc::new(handler),
        };

        match self.index.get(&key) {
            Some(&slot) => {
                warn!("tool '{}' already registered, overwriting", key);
                self.tools[slot] = tool;
            }
            None => {
                debug!("registered tool '{}'", key);
                self.index.insert(key, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Register a closure as a tool
    pub fn register_fn<F>(
        &mut self,
        name: impl AsRef<str>,
        description: impl Into<String>,
        signature: Signature,
        func: F,
    ) where
        F: Fn(&Arguments) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(name, description, FnTool::new(signature, func));
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index
            .get(&normalize_name(name))
            .map(|&slot| &self.tools[slot])
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool catalog for the system prompt: one `- name: description` line
    /// per tool, in registration order
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
