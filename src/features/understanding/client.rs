//! Language-model client used to interpret user messages

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use std::time::Duration;
use tokio::time::timeout;

/// Turns a prompt into the model's raw text answer
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI chat-completions backed model
///
/// The `openai` crate reads its key from the `OPENAI_KEY` environment variable.
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    model: String,
    max_tokens: u64,
    temperature: f32,
    top_p: f32,
    request_timeout: Duration,
}

impl OpenAiModel {
    pub fn new(model: impl Into<String>, max_tokens: u64) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature: 0.5,
            top_p: 0.9,
            request_timeout: Duration::from_secs(45),
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatCompletionMessage {
            role: ChatCompletionMessageRole::User,
            content: Some(prompt.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }];

        let completion = timeout(
            self.request_timeout,
            ChatCompletion::builder(&self.model, messages)
                .temperature(self.temperature)
                .top_p(self.top_p)
                .max_tokens(self.max_tokens)
                .create(),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "OpenAI request timed out after {} seconds",
                self.request_timeout.as_secs()
            )
        })??;

        let response = completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
            .trim()
            .to_string();

        debug!("Got model response: {} chars", response.len());
        Ok(response)
    }
}
