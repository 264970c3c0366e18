//! Bounded retries with exponential backoff around provider calls
//!
//! Only the external LLM call is retried. Orchestration never re-runs an
//! agent turn on its own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::{Message, Result, RetryConfig, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse};

/// Backoff schedule for one logical call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: usize,
    next_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            next_delay: config.initial_delay(),
            config,
            attempt: 0,
        }
    }

    /// Check if another retry is allowed
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_retries
    }

    /// Retries taken so far
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Delay before the next retry; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let mut delay = self.next_delay;

        if self.config.jitter && !delay.is_zero() {
            let jitter = rand::rng().random_range(0.0..0.3);
            let jitter_ms = (delay.as_millis() as f64 * jitter) as u64;
            delay += Duration::from_millis(jitter_ms);
        }

        self.attempt += 1;
        let grown = self.next_delay.as_millis() as f64 * self.config.backoff_multiplier as f64;
        self.next_delay = Duration::from_millis(grown.min(self.config.max_delay_ms as f64) as u64);

        delay
    }
}

/// Provider wrapper that retries transient failures
pub struct RetryingProvider {
    inner: Arc<dyn LLMProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn run<F, Fut>(&self, label: &str, mut operation: F) -> Result<LLMResponse>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<LLMResponse>>,
    {
        let mut policy = RetryPolicy::new(self.config.clone());

        loop {
            match operation().await {
                Ok(response) => {
                    if policy.attempt() > 0 {
                        debug!("{} succeeded after {} retries", label, policy.attempt());
                    }
                    return Ok(response);
                }
                Err(error) => {
                    if !error.is_transient() {
                        return Err(error);
                    }

                    if !policy.should_retry() {
                        warn!(
                            "{} failed after {} retries: {}",
                            label,
                            policy.attempt(),
                            error
                        );
                        return Err(error);
                    }

                    let delay = policy.next_delay();
                    warn!(
                        "{} attempt {} failed: {}. Retrying in {:?}",
                        label,
                        policy.attempt(),
                        error,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl LLMProvider for RetryingProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.run("chat", || self.inner.chat(model, messages, options.clone()))
            .await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.run("chat_with_tools", || {
            self.inner
                .chat_with_tools(model, messages, tools, options.clone())
        })
        .await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.inner.list_models().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DeskError;
    use crate::llm::scripted::ScriptedProvider;

    fn fast_retries(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 0,
            backoff_multiplier: 2.0,
            max_delay_ms: 0,
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut policy = RetryPolicy::new(RetryConfig {
            max_retries: 5,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 300,
            jitter: false,
        });

        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.next_delay(), Duration::from_millis(200));
        assert_eq!(policy.next_delay(), Duration::from_millis(300));
        assert_eq!(policy.attempt(), 3);
        assert!(policy.should_retry());
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_error("rate limited");
        script.push_text("ok");

        let provider = RetryingProvider::new(script.clone(), fast_retries(2));
        let response = provider
            .chat("m", &[Message::user("hi")], None)
            .await
            .unwrap();

        assert_eq!(response.content, "ok");
        assert_eq!(script.request_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let script = Arc::new(ScriptedProvider::new());
        for _ in 0..5 {
            script.push_error("unavailable");
        }

        let provider = RetryingProvider::new(script.clone(), fast_retries(2));
        let result = provider.chat("m", &[Message::user("hi")], None).await;

        tokio_test::assert_err!(result);
        assert_eq!(script.request_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let script = Arc::new(ScriptedProvider::new());
        script.push_failure(DeskError::ModelNotFound("missing".into()));
        script.push_text("never reached");

        let provider = RetryingProvider::new(script.clone(), fast_retries(3));
        let result = provider.chat("m", &[Message::user("hi")], None).await;

        assert!(matches!(result, Err(DeskError::ModelNotFound(_))));
        assert_eq!(script.request_count(), 1);
    }
}
