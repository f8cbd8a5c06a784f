//! `reflexa doctor` — Diagnose config and endpoint health.

use reflexa_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Reflexa Doctor — Diagnostics");
    println!("===============================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file — using defaults (run `reflexa onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!("     Endpoint: {}", config.api_url);
    println!("     Model:    {}", config.default_model);

    if config.has_api_key() {
        println!("  ✅ API key configured");

        match reflexa_providers::build_from_config(&config) {
            Ok(client) => {
                use reflexa_core::provider::CompletionClient;
                match client.health_check().await {
                    Ok(true) => println!("  ✅ Endpoint reachable ({})", client.name()),
                    Ok(false) => {
                        println!("  ❌ Endpoint rejected the request ({})", client.name());
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ❌ Endpoint unreachable: {e}");
                        issues += 1;
                    }
                }
            }
            Err(e) => {
                println!("  ❌ Could not build client: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key configured — set GROQ_API_KEY or api_key in config.toml");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
