//! `reflexa optimize` — Rewrite a prompt once.

use reflexa_agent::PromptOptimizer;
use reflexa_config::AppConfig;

pub async fn run(prompt: String, model: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if prompt.trim().is_empty() {
        return Err("Prompt must not be empty".into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let client = super::client_from_config(&config)?;
    let model = model.unwrap_or_else(|| config.default_model.clone());

    eprint!("  Optimizing...");
    let optimized = PromptOptimizer::new(client, model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .optimize(&prompt)
        .await;
    eprint!("\r              \r");

    if optimized == prompt {
        eprintln!("  (prompt unchanged)");
    }
    println!("{optimized}");
    Ok(())
}
