//! Bankdesk - multi-agent banking help desk
//!
//! Main entry point for the CLI application.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use bankdesk::banking::{build_group_chat, StubDirectory};
use bankdesk::cli::format_utterances;
use bankdesk::llm::OllamaClient;
use bankdesk::{Config, PolicyMode, Repl};

/// Bankdesk - multi-agent banking help desk
#[derive(Parser, Debug)]
#[command(name = "bankdesk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model used by the agents
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Model used by LLM-backed selection and termination
    #[arg(long)]
    policy_model: Option<String>,

    /// Turn policies: llm or rules
    #[arg(long)]
    policies: Option<PolicyMode>,

    /// Cap on agent turns per round
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Print single-prompt output as JSON
    #[arg(long, requires = "prompt")]
    json: bool,

    /// Print the default configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // the subscriber is not installed yet, so a bad file is reported below
    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    if let Some(ref model) = args.model {
        config.models.agent = model.clone();
    }
    if let Some(ref model) = args.policy_model {
        config.models.policy = model.clone();
    }
    if let Some(mode) = args.policies {
        config.chat.policy_mode = mode;
    }
    if let Some(max) = args.max_iterations {
        config.chat.max_iterations = max;
    }

    let filter = if args.debug {
        EnvFilter::new("bankdesk=debug")
    } else {
        EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = load_error {
        warn!(
            path = %Config::config_file().display(),
            error = %e,
            "ignoring config file, using defaults"
        );
    }

    config.validate().context("invalid configuration")?;

    if args.print_config {
        println!("{}", Config::default_config_toml());
        return Ok(());
    }
    if args.init_config {
        let path = config.save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let llm = Arc::new(OllamaClient::from_config(&config)?);

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let mut chat = build_group_chat(&config, llm, Arc::new(StubDirectory::new()))?;
        return match chat.submit(&prompt).await {
            Ok(utterances) if args.json => {
                println!("{}", serde_json::to_string_pretty(&utterances)?);
                Ok(())
            }
            Ok(utterances) => {
                println!("{}", format_utterances(&utterances));
                Ok(())
            }
            Err(e) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&e.produced)?);
                } else if !e.produced.is_empty() {
                    println!("{}", format_utterances(&e.produced));
                }
                Err(anyhow::Error::new(e.source).context("round failed"))
            }
        };
    }

    // Interactive REPL mode
    let mut repl = Repl::new(config, llm)?;
    repl.run().await?;

    Ok(())
}
