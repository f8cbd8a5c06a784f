//! Configuration loading, validation, and management for Reflexa.
//!
//! Loads configuration from `~/.reflexa/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.reflexa/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer credential for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reflection loop defaults
    #[serde(default)]
    pub reflection: ReflectionConfig,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("reflection", &self.reflection)
            .finish()
    }
}

/// Defaults for `reflexa run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    /// Maximum generate/critique rounds
    #[serde(default = "default_n_steps")]
    pub n_steps: usize,

    /// Messages kept per conversation, prefix included
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Rewrite the prompt before the first generation
    #[serde(default)]
    pub optimize_prompt: bool,

    /// Append the built-in generation/reflection instructions to user prompts
    #[serde(default = "default_true")]
    pub include_base_prompts: bool,
}

fn default_n_steps() -> usize {
    3
}
fn default_history_length() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            n_steps: default_n_steps(),
            history_length: default_history_length(),
            optimize_prompt: false,
            include_base_prompts: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reflexa/config.toml).
    ///
    /// Also checks environment variables:
    /// - `REFLEXA_API_KEY`, then `GROQ_API_KEY`, then `OPENAI_API_KEY`
    /// - `REFLEXA_API_URL`
    /// - `REFLEXA_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::config_path(), |key| std::env::var(key).ok())
    }

    /// Load `path`, apply overrides from `lookup`, then validate the result.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// A key already present in the file wins over the environment; URL and
    /// model variables always win.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank keys count as unset so the next variable is tried
        let key = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = key("REFLEXA_API_KEY")
                .or_else(|| key("GROQ_API_KEY"))
                .or_else(|| key("OPENAI_API_KEY"));
        }

        if let Some(url) = lookup("REFLEXA_API_URL") {
            self.api_url = url;
        }

        if let Some(model) = lookup("REFLEXA_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reflexa")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".into(),
            ));
        }

        if self.reflection.n_steps == 0 {
            return Err(ConfigError::ValidationError(
                "reflection.n_steps must be >= 1".into(),
            ));
        }

        if self.reflection.history_length == 0 {
            return Err(ConfigError::ValidationError(
                "reflection.history_length must be >= 1".into(),
            ));
        }

        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            reflection: ReflectionConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_model, "llama-3.3-70b-versatile");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.reflection.history_length, 3);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api_url, config.api_url);
        assert_eq!(parsed.reflection.n_steps, config.reflection.n_steps);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_steps_rejected() {
        let mut config = AppConfig::default();
        config.reflection.n_steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("n_steps"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "mixtral-8x7b-32768"

[reflection]
n_steps = 5
optimize_prompt = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "mixtral-8x7b-32768");
        assert_eq!(config.reflection.n_steps, 5);
        assert!(config.reflection.optimize_prompt);
        assert_eq!(config.reflection.history_length, 3);
        assert!(config.reflection.include_base_prompts);
        assert_eq!(config.max_tokens, 1000);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[reflection]\nhistory_length = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn env_key_precedence() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("GROQ_API_KEY", "gsk-groq"), ("OPENAI_API_KEY", "sk-oai")]));
        assert_eq!(config.api_key.as_deref(), Some("gsk-groq"));

        let mut config = AppConfig::default();
        config.apply_env(env(&[("REFLEXA_API_KEY", "rk"), ("GROQ_API_KEY", "gsk")]));
        assert_eq!(config.api_key.as_deref(), Some("rk"));
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(env(&[("REFLEXA_API_KEY", "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn blank_env_key_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("REFLEXA_API_KEY", "  ")]));
        assert!(!config.has_api_key());
    }

    #[test]
    fn blank_env_key_falls_through_to_next() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("REFLEXA_API_KEY", ""), ("GROQ_API_KEY", "gsk-real")]));
        assert_eq!(config.api_key.as_deref(), Some("gsk-real"));

        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("REFLEXA_API_KEY", " "),
            ("GROQ_API_KEY", ""),
            ("OPENAI_API_KEY", "sk-oai"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-oai"));
    }

    #[test]
    fn env_overrides_are_validated() {
        let missing = Path::new("/nonexistent/config.toml");

        let err = AppConfig::load_with(missing, env(&[("REFLEXA_API_URL", "")])).unwrap_err();
        assert!(err.to_string().contains("api_url"));

        let err = AppConfig::load_with(missing, env(&[("REFLEXA_MODEL", "  ")])).unwrap_err();
        assert!(err.to_string().contains("default_model"));

        let config = AppConfig::load_with(missing, env(&[("REFLEXA_MODEL", "gemma-7b-it")])).unwrap();
        assert_eq!(config.default_model, "gemma-7b-it");
    }

    #[test]
    fn env_overrides_url_and_model() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("REFLEXA_API_URL", "http://localhost:11434/v1"),
            ("REFLEXA_MODEL", "gemma-7b-it"),
        ]));
        assert_eq!(config.api_url, "http://localhost:11434/v1");
        assert_eq!(config.default_model, "gemma-7b-it");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("gsk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("api.groq.com"));
        assert!(toml_str.contains("[reflection]"));
        assert!(!toml_str.contains("api_key"));
    }
}
