//! Reactant - a ReAct tool-calling agent for your terminal

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{init_command, run_command, status_command, tools_command};

/// Reactant - ReAct agent for your terminal
#[derive(Parser)]
#[command(name = "reactant")]
#[command(about = "A ReAct tool-calling agent for your terminal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file to use instead of ~/.reactant/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directory
    Init,
    /// Ask the agent a question
    Run {
        /// Question to answer; starts an interactive prompt when omitted
        #[arg(short, long)]
        message: Option<String>,
        /// Step budget for each question
        #[arg(long)]
        max_steps: Option<u32>,
        /// Write the run report as JSON to this file
        #[arg(short, long)]
        transcript: Option<PathBuf>,
    },
    /// List configured tools
    Tools,
    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config;
    let result = match cli.command {
        Commands::Init => init_command(config).await,
        Commands::Run {
            message,
            max_steps,
            transcript,
        } => run_command(config, message, max_steps, transcript).await,
        Commands::Tools => tools_command(config).await,
        Commands::Status => status_command(config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
