pub mod config_cmd;
pub mod doctor;
pub mod onboard;
pub mod optimize;
pub mod run;
pub mod templates;

use std::sync::Arc;

use reflexa_config::AppConfig;
use reflexa_core::provider::CompletionClient;

/// Build the configured client, or explain how to supply a key.
pub(crate) fn client_from_config(
    config: &AppConfig,
) -> Result<Arc<dyn CompletionClient>, Box<dyn std::error::Error>> {
    // Fail early with setup guidance
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    REFLEXA_API_KEY  (generic)");
        eprintln!("    GROQ_API_KEY     (for Groq, the default endpoint)");
        eprintln!("    OPENAI_API_KEY   (with REFLEXA_API_URL=https://api.openai.com/v1)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let client = reflexa_providers::build_from_config(config)?;
    Ok(Arc::new(client))
}
