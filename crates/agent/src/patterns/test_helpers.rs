//! Shared test helpers for pattern tests.

use reflexa_core::error::CompletionError;
use reflexa_core::provider::{CompletionClient, CompletionRequest, CompletionResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

/// A mock client that answers from a script and records every request.
///
/// Either replays a fixed queue of results (panicking when it runs dry) or
/// computes each answer from the request with a closure.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            responder: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay successful texts in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Answer every request through `f`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let result = match &self.responder {
            Some(f) => f(&request),
            None => {
                let mut script = self.script.lock().unwrap();
                script.pop_front().unwrap_or_else(|| {
                    panic!(
                        "ScriptedClient: no more responses (call #{})",
                        self.call_count() + 1
                    )
                })
            }
        };

        self.requests.lock().unwrap().push(request);

        result.map(|content| CompletionResponse {
            content,
            model: "mock-model".into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}
