//! `reflexa config` — Configuration management commands.

use reflexa_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed and validated");

            if !config.has_api_key() {
                println!();
                println!("   ⚠️  No API key set (set REFLEXA_API_KEY or GROQ_API_KEY)");
            }

            println!();
            println!("   Endpoint:     {}", config.api_url);
            println!("   Model:        {}", config.default_model);
            println!("   Temperature:  {}", config.temperature);
            println!("   Max tokens:   {}", config.max_tokens);
            println!("   Timeout:      {}s", config.timeout_secs);
            println!("   Steps:        {}", config.reflection.n_steps);
            println!("   History:      {}", config.reflection.history_length);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render_redacted(&config)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

/// TOML with the API key masked.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}
