//! Reactant command implementations

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use reactant_agent::{register_command_tools, AgentLoop, AgentOptions, RunOutcome, ToolRegistry};
use reactant_config::{self, Config};
use reactant_provider::{OpenAiProvider, Provider};

const NO_ANSWER: &str = "No answer found";

/// Load the config from `path`, or from the default location
async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::load_from(path)
                .await
                .with_context(|| format!("failed to load {}", path.display()))?;
            Ok(config.with_env())
        }
        None => Config::load().await.context("failed to load config"),
    }
}

fn build_registry(config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_command_tools(&mut registry, &config.tools);
    registry
}

/// Initialize config and data directory
pub async fn init_command(path: Option<PathBuf>) -> Result<()> {
    println!("Initializing reactant...");

    let config_path = match path {
        Some(path) => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                Config::default().save_to(&path).await?;
                info!("config written to {}", path.display());
            }
            path
        }
        None => {
            reactant_config::init().await?;
            reactant_config::config_path()
        }
    };

    println!("Config: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set provider.api_key in the config, or export LLM_API_KEY");
    println!("  2. Add command tools under \"tools\"");
    println!("  3. Ask a question: reactant run -m \"What is the weather in Paris?\"");

    Ok(())
}

/// Answer one question, or read questions interactively
pub async fn run_command(
    config_path: Option<PathBuf>,
    message: Option<String>,
    max_steps: Option<u32>,
    transcript: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref()).await?;
    if let Some(steps) = max_steps {
        if steps == 0 {
            bail!("--max-steps must be at least 1");
        }
        config.agent.max_steps = steps;
    }

    let api_key = config
        .api_key()
        .context("No API key configured. Set provider.api_key in the config or LLM_API_KEY")?;
    let provider = OpenAiProvider::with_timeout(
        api_key,
        config.api_base(),
        Some(config.model()),
        Duration::from_secs(config.provider.timeout_secs),
    );
    info!("using model {}", provider.default_model());

    let tools = build_registry(&config);
    if tools.is_empty() {
        warn!("no tools configured; the agent can only answer directly");
    }
    let agent = AgentLoop::new(provider, tools, AgentOptions::from_config(&config));

    if let Some(question) = message {
        return answer(&agent, &question, transcript.as_deref()).await;
    }

    println!("Interactive mode (type 'exit' to quit)");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        answer(&agent, input, transcript.as_deref()).await?;
        println!();
    }

    Ok(())
}

async fn answer<P: Provider>(
    agent: &AgentLoop<P>,
    question: &str,
    transcript: Option<&Path>,
) -> Result<()> {
    let report = agent.run(question).await;

    match &report.outcome {
        RunOutcome::Finished(answer) => println!("{}", answer),
        RunOutcome::Exhausted => println!("{}", NO_ANSWER),
        RunOutcome::Aborted(reason) => {
            warn!("run aborted: {}", reason);
            println!("{}", NO_ANSWER);
        }
    }

    if let Some(path) = transcript {
        report
            .save_to(path)
            .await
            .with_context(|| format!("failed to write transcript {}", path.display()))?;
        info!("transcript written to {}", path.display());
    }

    Ok(())
}

/// Print the tool catalog the model sees
pub async fn tools_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref()).await?;
    let registry = build_registry(&config);

    if registry.is_empty() {
        println!("No tools configured");
    } else {
        println!("{}", registry.describe());
    }

    Ok(())
}

/// Show configuration status
pub async fn status_command(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path
        .clone()
        .unwrap_or_else(reactant_config::config_path);

    println!("Reactant status");
    println!(
        "Config:     {} {}",
        path.display(),
        if path.exists() { "[OK]" } else { "[Missing]" }
    );

    let config = load_config(config_path.as_deref()).await?;
    println!("Model:      {}", config.model());
    println!(
        "API base:   {}",
        config
            .api_base()
            .unwrap_or_else(|| "(provider default)".to_string())
    );
    println!(
        "API key:    {}",
        if config.has_api_key() { "[Set]" } else { "[Missing]" }
    );
    println!("Max steps:  {}", config.agent.max_steps);
    println!(
        "Prompt:     {}",
        format!("{:?}", config.agent.prompt_mode).to_lowercase()
    );
    println!("Tools:      {}", config.tools.len());

    Ok(())
}
