//! Common test utilities for reactant integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const LLM_VARS: &[&str] = &["LLM_MODEL_ID", "LLM_API_KEY", "LLM_BASE_URL", "LLM_TIMEOUT"];

/// An unroutable endpoint; every model call fails fast with a connect error
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:1/v1";

/// Isolated home directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".reactant");

        Ok(Self { temp_dir, data_dir })
    }

    /// Default config location inside the test home
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Path to a file in the test home
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Command running the reactant binary against the test home, with no
    /// LLM settings leaking in from the outer environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_reactant"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("RUST_LOG");
        for var in LLM_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Write a config file at the default location
    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.config_file(), json)?;
        Ok(())
    }

    /// Config with two command tools and an endpoint that cannot be reached
    pub fn create_config(&self) -> anyhow::Result<()> {
        self.write_config(&format!(
            r#"{{
  "provider": {{
    "api_key": "test-api-key",
    "api_base": "{}",
    "model": "test/model",
    "timeout_secs": 5
  }},
  "agent": {{
    "max_steps": 2,
    "retry": {{ "max_retries": 0 }}
  }},
  "tools": [
    {{
      "name": "get_weather",
      "description": "Get the current weather for a city. Args: city",
      "command": "echo \"Sunny in $ARG_CITY\"",
      "params": [{{ "name": "city" }}]
    }},
    {{
      "name": "search",
      "description": "Search the web. Args: query",
      "command": "echo \"no results for $ARG_QUERY\"",
      "params": [{{ "name": "query" }}]
    }}
  ]
}}"#,
            DEAD_ENDPOINT
        ))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
