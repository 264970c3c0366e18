//! Interactive REPL for Bankdesk
//!
//! Provides the main customer interaction loop.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::GroupChat;
use crate::banking::{build_group_chat, CustomerDirectory, StubDirectory, GREETING};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, DeskError, PolicyMode, Result, RoundError, Utterance};
use crate::llm::LLMProvider;

/// Render a round's utterances as `# NAME:` blocks
pub fn format_utterances(utterances: &[Utterance]) -> String {
    utterances
        .iter()
        .map(|u| format!("# {}:\n{}", u.speaker.to_string().to_uppercase(), u.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a failed round: whatever was said, then the error
pub fn format_round_error(err: &RoundError) -> String {
    if err.produced.is_empty() {
        format!("Error during chat invocation: {}", err)
    } else {
        format!(
            "{}\n\nError during chat invocation: {}",
            format_utterances(&err.produced),
            err
        )
    }
}

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    llm: Arc<dyn LLMProvider>,
    directory: Arc<dyn CustomerDirectory>,
    chat: GroupChat,
}

impl Repl {
    /// Create a REPL against the given provider
    pub fn new(config: Config, llm: Arc<dyn LLMProvider>) -> Result<Self> {
        let directory: Arc<dyn CustomerDirectory> = Arc::new(StubDirectory::new());
        let chat = build_group_chat(&config, llm.clone(), directory.clone())?;
        Ok(Self {
            config,
            llm,
            directory,
            chat,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chat(&self) -> &GroupChat {
        &self.chat
    }

    /// Check the backend is reachable and the configured models are pulled
    pub async fn initialize(&self) -> Result<()> {
        let models = self.llm.list_models().await.map_err(|e| {
            DeskError::provider(format!(
                "{} not reachable at {} ({})",
                self.llm.name(),
                self.config.ollama_url(),
                e
            ))
        })?;
        debug!(?models, "available models");

        let mut required = vec![&self.config.models.agent];
        if self.config.chat.policy_mode == PolicyMode::Llm {
            required.push(&self.config.models.policy);
        }

        for model in required {
            if !self.llm.is_model_available(model).await? {
                return Err(DeskError::ModelNotFound(model.clone()));
            }
        }

        Ok(())
    }

    /// Discard the session and start over
    pub fn reset(&mut self) -> Result<()> {
        self.chat = build_group_chat(&self.config, self.llm.clone(), self.directory.clone())?;
        Ok(())
    }

    /// Run one round, cancelling it on Ctrl+C
    pub async fn send(&mut self, text: &str) -> std::result::Result<Vec<Utterance>, RoundError> {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });

        let outcome = self.chat.submit_with_cancel(text, &cancel).await;
        watcher.abort();
        outcome
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        print!("Initializing...");
        io::stdout().flush()?;

        match self.initialize().await {
            Ok(()) => println!(" Ready!\n"),
            Err(e) => {
                println!("\n\nInitialization Error: {}\n", e);
                return Ok(());
            }
        }

        println!("{}\n", GREETING);

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            match handle_command(&input, &self.chat, &self.config) {
                CommandResult::Exit => {
                    println!("\nGoodbye!");
                    break;
                }
                CommandResult::Reset => {
                    self.reset()?;
                    println!("Session reset.\n\n{}\n", GREETING);
                }
                CommandResult::Handled(output) => println!("{}\n", output),
                CommandResult::None => {}
                CommandResult::Continue(text) => match self.send(&text).await {
                    Ok(utterances) => println!("\n{}\n", format_utterances(&utterances)),
                    Err(e) if e.is_cancelled() => {
                        println!("\n{}\n(round cancelled)\n", format_utterances(&e.produced))
                    }
                    Err(e) => eprintln!("\n{}\n", format_round_error(&e)),
                },
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = &self.config;

        println!(
            r#"
╔═══════════════════════════════════════════════╗
║   BANKDESK                                    ║
║   Multi-agent banking service desk            ║
╚═══════════════════════════════════════════════╝
"#
        );
        println!("Ollama:     {}", config.ollama_url());
        println!("Models:");
        println!("  Agents:   {}", config.models.agent);
        println!("  Policies: {} ({})", config.models.policy, config.chat.policy_mode);
        println!();
        println!("Commands: help, history, status, reset, exit");
        println!("─────────────────────────────────────────────────");
    }
}
