//! Reflexa CLI — the main entry point.
//!
//! Commands:
//! - `run`       — Generate, critique and revise until approved
//! - `optimize`  — Rewrite a prompt once and print it
//! - `templates` — List built-in starter prompts
//! - `onboard`   — Write a default config file
//! - `doctor`    — Diagnose config and endpoint health
//! - `config`    — Show, locate or validate the config

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reflexa",
    about = "Reflexa — generate, critique, repeat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reflection loop on a prompt
    Run(commands::run::RunArgs),

    /// Optimize a prompt without running the loop
    Optimize {
        /// The prompt to rewrite
        prompt: String,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List built-in template prompts
    Templates,

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and endpoint health
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for --json
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Optimize { prompt, model } => commands::optimize::run(prompt, model).await?,
        Commands::Templates => commands::templates::run(),
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
