//! Reflection pattern — Generate → Critique loop.
//!
//! Two conversations share one completion client. The generator sees its
//! instructions, the task, and a sliding window of (draft, critique) turns.
//! The reviewer sees its instructions and the same turns with the roles
//! swapped: drafts arrive as user messages and its own critiques are
//! assistant messages.
//!
//! # Step
//!
//! 1. **Generate** from the generation history
//! 2. Append the draft to both histories
//! 3. **Reflect** on the reflection history
//! 4. Record `{step, generation, critique}`
//! 5. Stop if the critique contains `<OK>`, otherwise append the critique to
//!    both histories and go again
//!
//! The loop also stops when the step budget runs out. Either way the result
//! carries the last draft, paired with the critique that ended the run.

use std::sync::Arc;

use chrono::Utc;
use reflexa_core::conversation::BoundedConversation;
use reflexa_core::event::{DomainEvent, EventBus, Phase, RunId};
use reflexa_core::message::Message;
use reflexa_core::provider::{
    CompletionClient, CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use reflexa_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::optimizer::PromptOptimizer;
use crate::prompts::{
    APPROVAL_SENTINEL, BASE_GENERATION_SYSTEM_PROMPT, BASE_REFLECTION_SYSTEM_PROMPT,
    compose_system_prompt,
};

/// Messages kept per conversation, prefix included.
pub const DEFAULT_HISTORY_LENGTH: usize = 3;

/// Step budget when the caller does not pick one.
pub const DEFAULT_STEPS: usize = 10;

/// Whether a critique approves the draft it reviewed.
pub fn is_approval(critique: &str) -> bool {
    critique.contains(APPROVAL_SENTINEL)
}

/// One generate/reflect round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step index
    pub step: usize,
    pub generation: String,
    pub critique: String,
}

impl StepRecord {
    pub fn is_approved(&self) -> bool {
        is_approval(&self.critique)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionOutcome {
    /// The last critique contained the sentinel
    Approved,
    /// The step budget ran out first
    Exhausted,
}

/// Input of a run.
#[derive(Debug, Clone)]
pub struct ReflectionRequest {
    pub user_message: String,
    /// Caller instructions for the generator (may be empty)
    pub generation_system_prompt: String,
    /// Caller instructions for the reviewer (may be empty)
    pub reflection_system_prompt: String,
    pub n_steps: usize,
    pub model: String,
    /// Rewrite `user_message` with the prompt optimizer first
    pub optimize_prompt: bool,
    /// Follow caller instructions with the built-in base prompts
    pub include_base_prompts: bool,
}

impl ReflectionRequest {
    pub fn new(user_message: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            generation_system_prompt: String::new(),
            reflection_system_prompt: String::new(),
            n_steps: DEFAULT_STEPS,
            model: model.into(),
            optimize_prompt: false,
            include_base_prompts: true,
        }
    }

    pub fn with_generation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.generation_system_prompt = prompt.into();
        self
    }

    pub fn with_reflection_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.reflection_system_prompt = prompt.into();
        self
    }

    pub fn with_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    pub fn with_optimize_prompt(mut self, enabled: bool) -> Self {
        self.optimize_prompt = enabled;
        self
    }

    pub fn with_base_prompts(mut self, enabled: bool) -> Self {
        self.include_base_prompts = enabled;
        self
    }

    fn generation_instructions(&self) -> String {
        if self.include_base_prompts {
            compose_system_prompt(&self.generation_system_prompt, BASE_GENERATION_SYSTEM_PROMPT)
        } else {
            self.generation_system_prompt.clone()
        }
    }

    fn reflection_instructions(&self) -> String {
        if self.include_base_prompts {
            compose_system_prompt(&self.reflection_system_prompt, BASE_REFLECTION_SYSTEM_PROMPT)
        } else {
            self.reflection_system_prompt.clone()
        }
    }
}

/// The result of a reflection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionResult {
    pub run_id: RunId,
    /// The task text the generator actually saw
    pub prompt: String,
    /// The last generation produced
    pub final_text: String,
    pub outcome: ReflectionOutcome,
    pub steps: Vec<StepRecord>,
}

/// Runs the generate/critique loop against one completion client.
pub struct ReflectionAgent {
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_tokens: u32,
    history_length: usize,
    event_bus: Arc<EventBus>,
}

impl ReflectionAgent {
    pub fn new(client: Arc<dyn CompletionClient>, event_bus: Arc<EventBus>) -> Self {
        Self {
            client,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            history_length: DEFAULT_HISTORY_LENGTH,
            event_bus,
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

    /// Set how many messages each conversation keeps, prefix included.
    pub fn with_history_length(mut self, history_length: usize) -> Self {
        self.history_length = history_length;
        self
    }

    /// Execute the loop.
    ///
    /// A failed completion aborts the run and is returned as is; steps
    /// finished before the failure are only visible as `StepCompleted`
    /// events on the bus.
    pub async fn run(&self, request: &ReflectionRequest) -> Result<ReflectionResult> {
        if request.n_steps == 0 {
            return Err(Error::InvalidRequest("n_steps must be at least 1".into()));
        }

        let run_id = RunId::new();
        let total = request.n_steps;

        info!(%run_id, model = %request.model, max_steps = total, "Reflection loop starting");
        self.event_bus.publish(DomainEvent::RunStarted {
            run_id: run_id.clone(),
            model: request.model.clone(),
            total_steps: total,
            timestamp: Utc::now(),
        });

        let prompt = if request.optimize_prompt {
            let optimized = PromptOptimizer::new(self.client.clone(), &request.model)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens)
                .optimize(&request.user_message)
                .await;
            self.event_bus.publish(DomainEvent::PromptOptimized {
                run_id: run_id.clone(),
                changed: optimized != request.user_message,
                timestamp: Utc::now(),
            });
            optimized
        } else {
            request.user_message.clone()
        };

        let mut generation = BoundedConversation::new(
            vec![
                Message::system(request.generation_instructions()),
                Message::user(&prompt),
            ],
            self.history_length,
        );
        let mut reflection = BoundedConversation::new(
            vec![Message::system(request.reflection_instructions())],
            self.history_length,
        );

        let mut steps: Vec<StepRecord> = Vec::new();

        for step in 1..=total {
            let draft = self
                .call(&run_id, step, total, Phase::Generating, &request.model, &generation)
                .await?;
            generation.append(Message::assistant(&draft));
            reflection.append(Message::user(&draft));

            let critique = self
                .call(&run_id, step, total, Phase::Reflecting, &request.model, &reflection)
                .await?;

            let record = StepRecord {
                step,
                generation: draft,
                critique,
            };
            let approved = record.is_approved();
            debug!(%run_id, step, approved, "Reflection step completed");

            self.event_bus.publish(DomainEvent::StepCompleted {
                run_id: run_id.clone(),
                step,
                generation: record.generation.clone(),
                critique: record.critique.clone(),
                approved,
                timestamp: Utc::now(),
            });

            if approved {
                steps.push(record);
                break;
            }

            generation.append(Message::user(&record.critique));
            reflection.append(Message::assistant(&record.critique));
            steps.push(record);
        }

        let last = steps
            .last()
            .ok_or_else(|| Error::Internal("reflection loop finished without a step".into()))?;
        let final_text = last.generation.clone();
        let outcome = if last.is_approved() {
            ReflectionOutcome::Approved
        } else {
            ReflectionOutcome::Exhausted
        };

        info!(%run_id, steps = steps.len(), ?outcome, "Reflection loop completed");
        self.event_bus.publish(DomainEvent::RunFinished {
            run_id: run_id.clone(),
            steps: steps.len(),
            approved: outcome == ReflectionOutcome::Approved,
            timestamp: Utc::now(),
        });

        Ok(ReflectionResult {
            run_id,
            prompt,
            final_text,
            outcome,
            steps,
        })
    }

    /// One completion over `conversation`, with progress and failure events.
    async fn call(
        &self,
        run_id: &RunId,
        step: usize,
        total: usize,
        phase: Phase,
        model: &str,
        conversation: &BoundedConversation,
    ) -> Result<String> {
        self.event_bus.publish(DomainEvent::PhaseStarted {
            run_id: run_id.clone(),
            step,
            total_steps: total,
            phase,
            timestamp: Utc::now(),
        });

        let request = CompletionRequest::new(model, conversation.messages())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        match self.client.complete(request).await {
            Ok(response) => Ok(response.content),
            Err(e) => {
                warn!(%run_id, step, %phase, error = %e, "Completion failed, aborting run");
                self.event_bus.publish(DomainEvent::RunFailed {
                    run_id: run_id.clone(),
                    step,
                    phase,
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_helpers::ScriptedClient;
    use reflexa_core::error::CompletionError;
    use reflexa_core::message::Role;

    const GEN_SYS: &str = "Be terse.";
    const REFL_SYS: &str = "Approve one-word answers.";

    fn agent(client: Arc<ScriptedClient>) -> ReflectionAgent {
        ReflectionAgent::new(client, Arc::new(EventBus::default()))
    }

    fn request(n_steps: usize) -> ReflectionRequest {
        ReflectionRequest::new("Say hello.", "mock-model")
            .with_generation_prompt(GEN_SYS)
            .with_reflection_prompt(REFL_SYS)
            .with_base_prompts(false)
            .with_steps(n_steps)
    }

    /// Drafts come back numbered; critiques follow `critique`.
    fn role_client<F>(critique: F) -> ScriptedClient
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        let counter = std::sync::atomic::AtomicUsize::new(0);
        let reflections = std::sync::atomic::AtomicUsize::new(0);
        ScriptedClient::from_fn(move |req| {
            if req.messages[0].content() == GEN_SYS {
                let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                Ok(format!("draft {n}"))
            } else {
                let n = reflections.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                Ok(critique(n))
            }
        })
    }

    #[tokio::test]
    async fn approval_on_first_step() {
        let client = Arc::new(ScriptedClient::texts(&["Hello.", "<OK>"]));
        let result = agent(client.clone()).run(&request(2)).await.unwrap();

        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.final_text, "Hello.");
        assert_eq!(result.outcome, ReflectionOutcome::Approved);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_draft() {
        let client = Arc::new(role_client(|_| "Too short, expand.".into()));
        let result = agent(client.clone()).run(&request(3)).await.unwrap();

        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.final_text, "draft 3");
        assert_eq!(result.outcome, ReflectionOutcome::Exhausted);
        assert_eq!(client.call_count(), 6);
        let indices: Vec<_> = result.steps.iter().map(|s| s.step).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stops_right_after_approving_step() {
        let client = Arc::new(role_client(|n| {
            if n == 2 {
                "Looks good now. <OK>".into()
            } else {
                "Needs work.".into()
            }
        }));
        let result = agent(client.clone()).run(&request(5)).await.unwrap();

        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.final_text, "draft 2");
        assert_eq!(result.steps[1].critique, "Looks good now. <OK>");
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn never_exceeds_budget() {
        for k in 1..=4 {
            let client = Arc::new(role_client(|n| format!("critique {n}")));
            let result = agent(client.clone()).run(&request(k)).await.unwrap();
            assert_eq!(result.steps.len(), k);
            assert_eq!(client.call_count(), 2 * k);
        }
    }

    #[tokio::test]
    async fn conversations_swap_roles_and_stay_bounded() {
        let client = Arc::new(role_client(|n| format!("critique {n}")));
        agent(client.clone()).run(&request(3)).await.unwrap();
        let reqs = client.requests();

        // Step 1 generate: prefix only.
        assert_eq!(reqs[0].messages.len(), 2);
        assert_eq!(reqs[0].messages[1].content(), "Say hello.");

        // Step 1 reflect: system + draft as user.
        assert_eq!(reqs[1].messages.len(), 2);
        assert_eq!(reqs[1].messages[0].content(), REFL_SYS);
        assert_eq!(reqs[1].messages[1].role(), Role::User);
        assert_eq!(reqs[1].messages[1].content(), "draft 1");

        // Step 2 generate: prefix + latest critique as user (draft 1 evicted).
        let gen2 = &reqs[2].messages;
        assert_eq!(gen2.len(), 3);
        assert_eq!(gen2[0].content(), GEN_SYS);
        assert_eq!(gen2[1].content(), "Say hello.");
        assert_eq!(gen2[2].role(), Role::User);
        assert_eq!(gen2[2].content(), "critique 1");

        // Step 2 reflect: system + newest draft only.
        let refl2 = &reqs[3].messages;
        assert_eq!(refl2.len(), 3);
        assert_eq!(refl2[1].role(), Role::Assistant);
        assert_eq!(refl2[1].content(), "critique 1");
        assert_eq!(refl2[2].role(), Role::User);
        assert_eq!(refl2[2].content(), "draft 2");

        for req in &reqs {
            assert!(req.messages.len() <= DEFAULT_HISTORY_LENGTH);
            assert_eq!(req.model, "mock-model");
            assert_eq!(req.max_tokens, 1000);
        }
    }

    #[tokio::test]
    async fn failure_propagates_and_aborts() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("draft".into()),
            Err(CompletionError::Service {
                status_code: 503,
                body: "overloaded".into(),
            }),
        ]));
        let err = agent(client.clone()).run(&request(3)).await.unwrap_err();

        match err {
            Error::Completion(CompletionError::Service { status_code, .. }) => {
                assert_eq!(status_code, 503)
            }
            other => panic!("Expected service error, got {other:?}"),
        }
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn zero_steps_rejected_without_calls() {
        let client = Arc::new(ScriptedClient::texts(&[]));
        let err = agent(client.clone()).run(&request(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_task_is_sent_as_is() {
        let client = Arc::new(ScriptedClient::texts(&["?", "<OK>"]));
        let req = ReflectionRequest::new("  ", "mock-model").with_steps(1);
        let result = agent(client.clone()).run(&req).await.unwrap();

        assert_eq!(result.final_text, "?");
        assert_eq!(client.requests()[0].messages[1].content(), "  ");
    }

    #[tokio::test]
    async fn base_prompts_follow_custom_instructions() {
        let client = Arc::new(ScriptedClient::texts(&["Hi", "<OK>"]));
        let req = request(1).with_base_prompts(true);
        agent(client.clone()).run(&req).await.unwrap();

        let reqs = client.requests();
        let gen_sys = reqs[0].messages[0].content();
        assert!(gen_sys.starts_with(GEN_SYS));
        assert!(gen_sys.contains("expert content creator"));
        let refl_sys = reqs[1].messages[0].content();
        assert!(refl_sys.starts_with(REFL_SYS));
        assert!(refl_sys.contains(APPROVAL_SENTINEL));
    }

    #[tokio::test]
    async fn optimized_prompt_becomes_task() {
        let client = Arc::new(ScriptedClient::texts(&[
            "Say hello politely in one word.",
            "Hello.",
            "<OK>",
        ]));
        let req = request(2).with_optimize_prompt(true);
        let result = agent(client.clone()).run(&req).await.unwrap();

        assert_eq!(result.prompt, "Say hello politely in one word.");
        let reqs = client.requests();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[1].messages[1].content(), "Say hello politely in one word.");
    }

    #[tokio::test]
    async fn failed_optimization_keeps_original_task() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(CompletionError::Transport("timeout".into())),
            Ok("Hello.".into()),
            Ok("<OK>".into()),
        ]));
        let req = request(1).with_optimize_prompt(true);
        let result = agent(client).run(&req).await.unwrap();
        assert_eq!(result.prompt, "Say hello.");
        assert_eq!(result.final_text, "Hello.");
    }

    #[tokio::test]
    async fn progress_events_in_order() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let client = Arc::new(ScriptedClient::texts(&["a", "fix it", "b", "<OK>"]));
        ReflectionAgent::new(client, bus.clone())
            .run(&request(3))
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::RunStarted { .. } => "start".to_string(),
                DomainEvent::PhaseStarted { step, phase, .. } => format!("{step}:{phase}"),
                DomainEvent::StepCompleted { step, approved, .. } => format!("{step}:done:{approved}"),
                DomainEvent::RunFinished { approved, .. } => format!("finish:{approved}"),
                other => panic!("unexpected event {other:?}"),
            });
        }
        assert_eq!(
            kinds,
            vec![
                "start",
                "1:generating",
                "1:reflecting",
                "1:done:false",
                "2:generating",
                "2:reflecting",
                "2:done:true",
                "finish:true",
            ]
        );
    }

    #[tokio::test]
    async fn result_serializes_for_json_output() {
        let client = Arc::new(ScriptedClient::texts(&["Hello.", "<OK>"]));
        let result = agent(client).run(&request(1)).await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "approved");
        assert_eq!(json["final_text"], "Hello.");
        assert_eq!(json["steps"][0]["step"], 1);
        assert_eq!(json["steps"][0]["critique"], "<OK>");
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_approval("<OK>"));
        assert!(is_approval("All good. <OK>"));
        assert!(!is_approval("OK"));
        assert!(!is_approval("<ok>"));
    }
}
