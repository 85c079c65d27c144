//! Configuration management
//!
//! Model endpoint, learning thresholds and server settings. The API key is
//! stored separately (see [`crate::security::keyring`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::{LearningRate, Threshold};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Chat model settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Promotion thresholds
    #[serde(default)]
    pub learning: LearningConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for summaries, observations and rules
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    crate::agent::llm::OPENROUTER_BASE_URL.to_string()
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Tier used when a request names no threshold
    #[serde(default)]
    pub learning_rate: LearningRate,
    /// Explicit threshold, overrides `learning_rate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
}

impl LearningConfig {
    pub fn default_threshold(&self) -> Threshold {
        self.threshold.unwrap_or_else(|| self.learning_rate.threshold())
    }

    /// Threshold for a request: explicit value, then tier, then configured default
    pub fn resolve(&self, threshold: Option<Threshold>, learning_rate: Option<LearningRate>) -> Threshold {
        threshold
            .or_else(|| learning_rate.map(LearningRate::threshold))
            .unwrap_or_else(|| self.default_threshold())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for one summary or learning round
    #[serde(default = "default_round_timeout")]
    pub round_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_round_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            round_timeout_secs: default_round_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from the default file, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "pref-learner", "pref-learner")
        .context("Failed to get project directories")
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!("  base_url:        {}", config.llm.base_url);
    println!("  model:           {}", config.llm.model);
    println!("  request timeout: {}s", config.llm.request_timeout_secs);
    println!("  learning rate:   {}", config.learning.learning_rate);
    println!("  threshold:       {}", config.learning.default_threshold());
    println!("  server:          {}:{}", config.server.host, config.server.port);
    println!("  round timeout:   {}s", config.server.round_timeout_secs);
    println!(
        "  API key:         {}",
        if crate::security::has_api_key() { "configured" } else { "not set" }
    );

    Ok(())
}

/// Set the model used for every call
pub fn set_model(model: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.llm.model = model.to_string();
    config.save()?;
    println!("Model set to: {}", model);
    Ok(())
}

/// Set the API base URL
pub fn set_base_url(url: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.llm.base_url = url.trim_end_matches('/').to_string();
    config.save()?;
    println!("Base URL set to: {}", config.llm.base_url);
    Ok(())
}

/// Set the default learning rate and clear any explicit threshold
pub fn set_learning_rate(rate: LearningRate) -> Result<()> {
    let mut config = Config::load()?;
    config.learning.learning_rate = rate;
    config.learning.threshold = None;
    config.save()?;
    println!("Learning rate set to {} (threshold {})", rate, rate.threshold());
    Ok(())
}

/// Set an explicit default threshold
pub fn set_threshold(value: u32) -> Result<()> {
    let threshold = Threshold::new(value)?;
    let mut config = Config::load()?;
    config.learning.threshold = Some(threshold);
    config.save()?;
    println!("Promotion threshold set to {}", threshold);
    Ok(())
}

/// Set API key
pub fn set_api_key(key: &str) -> Result<()> {
    crate::security::keyring::set_api_key(key)?;
    println!("API key stored securely.");
    Ok(())
}
