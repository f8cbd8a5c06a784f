//! Prompt optimizer — one completion call that rewrites the user's request.
//!
//! Fail-open: any completion error yields the original prompt.

use std::sync::Arc;

use reflexa_core::message::Message;
use reflexa_core::provider::{
    CompletionClient, CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use tracing::{debug, warn};

use crate::prompts::{OPTIMIZATION_SYSTEM_PROMPT, optimization_request};

pub struct PromptOptimizer {
    client: Arc<dyn CompletionClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl PromptOptimizer {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The two messages sent for `user_prompt`.
    pub fn build_messages(user_prompt: &str) -> Vec<Message> {
        vec![
            Message::system(OPTIMIZATION_SYSTEM_PROMPT),
            Message::user(optimization_request(user_prompt)),
        ]
    }

    /// Rewrite `user_prompt`, or return it unchanged if the call fails.
    ///
    /// The rewrite is taken verbatim, even when empty.
    pub async fn optimize(&self, user_prompt: &str) -> String {
        let request = CompletionRequest::new(&self.model, Self::build_messages(user_prompt))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        match self.client.complete(request).await {
            Ok(response) => {
                debug!(
                    original_len = user_prompt.len(),
                    optimized_len = response.content.len(),
                    "Prompt optimized"
                );
                response.content
            }
            Err(e) => {
                warn!(client = %self.client.name(), error = %e, "Prompt optimization failed, using original prompt");
                user_prompt.to_string()
            }
        }
    }
}
