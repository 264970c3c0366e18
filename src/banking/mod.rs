//! Banking desk roster
//!
//! A receptionist that verifies identity and routes requests, an address
//! updater, and an operator for everything else.

pub mod capabilities;
pub mod directory;
pub mod prompts;

use std::sync::Arc;

use tracing::debug;

use crate::agent::{ChatAgent, GroupChat};
use crate::core::{Config, PolicyMode, Result};
use crate::llm::{LLMProvider, RetryingProvider};
use crate::policy::{
    LlmSelectionPolicy, LlmTerminationPolicy, Route, RuleBasedSelectionPolicy,
    RuleBasedTerminationPolicy,
};
use crate::tools::CapabilityRegistry;

pub use directory::{CustomerDirectory, CustomerRecord, StubDirectory};

pub const RECEPTIONIST: &str = "Receptionist";
pub const ADDRESS_UPDATER: &str = "AddressUpdater";
pub const OTHER_TASK_OPERATOR: &str = "OtherTaskOperator";

/// Shown to the customer when a session opens
pub const GREETING: &str = "こんにちは！ご要件はなんでしょうか？";

fn agent(
    name: &str,
    instructions: &str,
    capabilities: CapabilityRegistry,
    llm: &Arc<dyn LLMProvider>,
    config: &Config,
) -> Result<Arc<ChatAgent>> {
    let agent = ChatAgent::builder(name)
        .instructions(instructions)
        .capabilities(capabilities)
        .llm(llm.clone())
        .model(&config.models.agent)
        .temperature(config.models.agent_temperature)
        .history_window(config.chat.agent_window)
        .max_tool_rounds(config.chat.max_tool_rounds)
        .build()?;
    Ok(Arc::new(agent))
}

/// Wire the banking roster into a group chat
///
/// Provider calls are retried per `config.retry`; the policies are picked by
/// `config.chat.policy_mode`.
pub fn build_group_chat(
    config: &Config,
    llm: Arc<dyn LLMProvider>,
    directory: Arc<dyn CustomerDirectory>,
) -> Result<GroupChat> {
    let llm: Arc<dyn LLMProvider> = if config.retry.max_retries > 0 {
        Arc::new(RetryingProvider::new(llm, config.retry.clone()))
    } else {
        llm
    };

    let receptionist = agent(
        RECEPTIONIST,
        prompts::RECEPTIONIST_INSTRUCTIONS,
        capabilities::verify_identity(directory.clone()),
        &llm,
        config,
    )?;
    let address_updater = agent(
        ADDRESS_UPDATER,
        prompts::ADDRESS_UPDATER_INSTRUCTIONS,
        capabilities::address_update(directory),
        &llm,
        config,
    )?;
    let other_task_operator = agent(
        OTHER_TASK_OPERATOR,
        prompts::OTHER_TASK_OPERATOR_INSTRUCTIONS,
        CapabilityRegistry::new(),
        &llm,
        config,
    )?;

    let builder = GroupChat::builder()
        .agent(receptionist)
        .agent(address_updater)
        .agent(other_task_operator)
        .entry_agent(RECEPTIONIST)
        .max_iterations(config.chat.max_iterations);

    debug!(mode = %config.chat.policy_mode, "building banking group chat");

    let builder = match config.chat.policy_mode {
        PolicyMode::Llm => {
            let selection = LlmSelectionPolicy::new(
                llm.clone(),
                &config.models.policy,
                prompts::selection_prompt(RECEPTIONIST, ADDRESS_UPDATER, OTHER_TASK_OPERATOR),
                RECEPTIONIST,
            )?
            .with_window(config.chat.selection_window)
            .with_temperature(config.models.policy_temperature);

            let termination =
                LlmTerminationPolicy::new(llm, &config.models.policy, prompts::TERMINATION_PROMPT)?
                    .with_window(config.chat.termination_window)
                    .with_temperature(config.models.policy_temperature);

            builder.selection(selection).termination(termination)
        }
        PolicyMode::Rules => builder
            .selection(RuleBasedSelectionPolicy::new(
                RECEPTIONIST,
                vec![Route::new(ADDRESS_UPDATER, prompts::ADDRESS_CHANGE_KEYWORDS)],
                OTHER_TASK_OPERATOR,
            ))
            .termination(RuleBasedTerminationPolicy::new([
                ADDRESS_UPDATER,
                OTHER_TASK_OPERATOR,
            ])),
    };

    builder.build()
}
