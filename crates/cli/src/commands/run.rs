//! `reflexa run` — Run the reflection loop with a live progress bar.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use reflexa_agent::{
    ReflectionAgent, ReflectionOutcome, ReflectionRequest, ReflectionResult, TEMPLATES,
    find_template,
};
use reflexa_config::AppConfig;
use reflexa_core::event::{DomainEvent, EventBus, Phase};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

const BAR_WIDTH: usize = 20;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The request to work on
    pub prompt: Option<String>,

    /// Use a built-in template instead of PROMPT (see `reflexa templates`)
    #[arg(short, long, conflicts_with = "prompt")]
    pub template: Option<String>,

    /// Maximum generate/critique rounds
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,

    /// Override the configured model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Optimize the prompt before the first round
    #[arg(long)]
    pub optimize: bool,

    /// Extra instructions for the generator
    #[arg(long, default_value = "")]
    pub generation_prompt: String,

    /// Extra instructions for the reviewer
    #[arg(long, default_value = "")]
    pub reflection_prompt: String,

    /// Print the run as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let prompt = resolve_prompt(args.prompt.clone(), args.template.as_deref())?;
    let client = super::client_from_config(&config)?;

    let request = build_request(&args, &config, prompt);
    debug!(model = %request.model, steps = request.n_steps, optimize = request.optimize_prompt, "Prepared reflection request");

    let event_bus = Arc::new(EventBus::default());
    let progress = spawn_progress(&event_bus, args.json);

    let agent = ReflectionAgent::new(client, event_bus.clone())
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_history_length(config.reflection.history_length);

    let outcome = agent.run(&request).await;

    // Closing the bus ends the progress task
    drop(agent);
    drop(event_bus);
    let _ = progress.await;

    let result = outcome?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_transcript(&result, &request.user_message));
    }

    Ok(())
}

/// Pick the prompt from the positional argument or a named template.
pub(crate) fn resolve_prompt(
    prompt: Option<String>,
    template: Option<&str>,
) -> Result<String, String> {
    if let Some(name) = template {
        return find_template(name)
            .map(|t| t.prompt.to_string())
            .ok_or_else(|| {
                let names: Vec<_> = TEMPLATES.iter().map(|t| t.name).collect();
                format!("Unknown template '{name}'. Available: {}", names.join(", "))
            });
    }

    match prompt {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err("Provide a PROMPT or --template NAME".into()),
    }
}

/// Command-line flags win over config.
pub(crate) fn build_request(
    args: &RunArgs,
    config: &AppConfig,
    prompt: String,
) -> ReflectionRequest {
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());

    ReflectionRequest::new(prompt, model)
        .with_generation_prompt(&args.generation_prompt)
        .with_reflection_prompt(&args.reflection_prompt)
        .with_steps(args.steps.unwrap_or(config.reflection.n_steps))
        .with_optimize_prompt(args.optimize || config.reflection.optimize_prompt)
        .with_base_prompts(config.reflection.include_base_prompts)
}

/// Render a progress line for the phase that just started.
pub(crate) fn render_bar(step: usize, total: usize, phase: Phase) -> String {
    let done = 2 * step.saturating_sub(1)
        + match phase {
            Phase::Generating => 0,
            Phase::Reflecting => 1,
        };
    let filled = if total == 0 {
        BAR_WIDTH
    } else {
        (done * BAR_WIDTH / (2 * total)).min(BAR_WIDTH)
    };
    format!(
        "[{}{}] step {step}/{total} {phase}...",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

fn spawn_progress(event_bus: &EventBus, quiet: bool) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        let mut stderr = std::io::stderr();
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            if quiet {
                continue;
            }
            match event.as_ref() {
                DomainEvent::PromptOptimized { changed, .. } => {
                    let note = if *changed { "optimized" } else { "unchanged" };
                    let _ = writeln!(stderr, "  Prompt {note}");
                }
                DomainEvent::PhaseStarted {
                    step,
                    total_steps,
                    phase,
                    ..
                } => {
                    let _ = write!(stderr, "\r  {}   ", render_bar(*step, *total_steps, *phase));
                    let _ = stderr.flush();
                }
                DomainEvent::StepCompleted { step, approved, .. } => {
                    let mark = if *approved { "approved" } else { "revising" };
                    let _ = writeln!(stderr, "\r  Step {step} done ({mark}){}", " ".repeat(BAR_WIDTH + 16));
                }
                DomainEvent::RunFailed { step, phase, .. } => {
                    let _ = writeln!(stderr, "\r  Step {step} failed while {phase}");
                }
                _ => {}
            }
        }
    })
}

/// Text transcript: the optimized prompt when it changed, every step, then the final text.
pub(crate) fn format_transcript(result: &ReflectionResult, original_prompt: &str) -> String {
    let mut out = String::from("\n");

    if result.prompt != original_prompt {
        out.push_str("── Optimized prompt ─────────────────────\n\n");
        out.push_str(&result.prompt);
        out.push_str("\n\n");
    }

    for record in &result.steps {
        out.push_str(&format!(
            "── Step {} ──────────────────────────────\n\n",
            record.step
        ));
        out.push_str(&format!("Generation:\n{}\n\n", record.generation));
        out.push_str(&format!("Critique:\n{}\n\n", record.critique));
    }

    let verdict = match result.outcome {
        ReflectionOutcome::Approved => "approved",
        ReflectionOutcome::Exhausted => "step budget exhausted",
    };
    out.push_str(&format!(
        "══ Final ({verdict} after {} step(s)) ══\n\n{}\n",
        result.steps.len(),
        result.final_text
    ));
    out
}
