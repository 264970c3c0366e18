//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::{render_transcript, GroupChat};
use crate::core::Config;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Send as a customer message
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Start a fresh session
    Reset,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, chat: &GroupChat, config: &Config) -> CommandResult {
    let input = input.trim();
    if input.is_empty() {
        return CommandResult::None;
    }

    // without a slash, only a bare word is a command
    let slashed = input.starts_with('/');
    if !slashed && input.split_whitespace().nth(1).is_some() {
        return CommandResult::Continue(input.to_string());
    }

    let cmd = input.split_whitespace().next().unwrap_or("").to_lowercase();
    let cmd = cmd.strip_prefix('/').unwrap_or(&cmd);

    match cmd {
        "exit" | "quit" | "q" => CommandResult::Exit,

        "reset" | "clear" => CommandResult::Reset,

        "help" | "?" => CommandResult::Handled(help_text()),

        "history" => {
            if chat.history().is_empty() {
                CommandResult::Handled("(no messages yet)".to_string())
            } else {
                CommandResult::Handled(render_transcript(chat.history().as_slice()))
            }
        }

        "status" => CommandResult::Handled(status_text(chat, config)),

        _ => {
            if slashed {
                CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                ))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

fn status_text(chat: &GroupChat, config: &Config) -> String {
    let (selection, termination) = chat.policy_names();
    format!(
        "Bankdesk Status:\n\
         ─────────────────────────────\n\
         Ollama:       {}\n\
         Agent model:  {}\n\
         Policy model: {}\n\
         Policies:     selection={}, termination={}\n\
         Agents:       {}\n\
         Phase:        {}\n\
         Last round:   {} / {} turns\n\
         History:      {} messages",
        config.ollama_url(),
        config.models.agent,
        config.models.policy,
        selection,
        termination,
        chat.agent_names().join(", "),
        chat.phase(),
        chat.iteration_count(),
        chat.max_iterations(),
        chat.history().len(),
    )
}

/// Generate help text
fn help_text() -> String {
    r#"Bankdesk Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Bankdesk
  reset, clear     Start a new session
  history          Show the conversation so far
  status           Show models, policies and round state

Keyboard Shortcuts:
  Ctrl+C           Cancel the running round
  Ctrl+D           Exit Bankdesk

Anything else is sent to the desk as a customer message.
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banking::{build_group_chat, StubDirectory};
    use crate::core::{PolicyMode, RetryConfig};
    use crate::llm::ScriptedProvider;
    use std::sync::Arc;

    fn setup() -> (GroupChat, Config) {
        let mut config = Config::default();
        config.chat.policy_mode = PolicyMode::Rules;
        config.retry = RetryConfig::disabled();
        let chat = build_group_chat(
            &config,
            Arc::new(ScriptedProvider::new()),
            Arc::new(StubDirectory::new()),
        )
        .unwrap();
        (chat, config)
    }

    #[test]
    fn test_commands() {
        let (chat, config) = setup();
        assert_eq!(handle_command("exit", &chat, &config), CommandResult::Exit);
        assert_eq!(handle_command("/reset", &chat, &config), CommandResult::Reset);
        assert_eq!(handle_command("   ", &chat, &config), CommandResult::None);
        assert_eq!(
            handle_command("住所を変更したい", &chat, &config),
            CommandResult::Continue("住所を変更したい".to_string())
        );
        assert!(matches!(
            handle_command("/bogus", &chat, &config),
            CommandResult::Handled(msg) if msg.contains("Unknown command")
        ));
    }

    #[test]
    fn test_sentences_starting_with_a_command_word_are_messages() {
        let (chat, config) = setup();
        for text in ["reset my address please", "history of my account", "quit my job"] {
            assert_eq!(
                handle_command(text, &chat, &config),
                CommandResult::Continue(text.to_string())
            );
        }
        assert_eq!(handle_command(" RESET ", &chat, &config), CommandResult::Reset);
        assert_eq!(handle_command("/reset now", &chat, &config), CommandResult::Reset);
    }

    #[test]
    fn test_status_mentions_policies() {
        let (chat, config) = setup();
        match handle_command("status", &chat, &config) {
            CommandResult::Handled(text) => {
                assert!(text.contains("selection=rules"));
                assert!(text.contains("Receptionist, AddressUpdater, OtherTaskOperator"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
