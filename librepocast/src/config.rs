//! Configuration management for Repocast

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::feed::trending::DEFAULT_TRENDING_URL;
use crate::pipeline::MediaFailurePolicy;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    pub generator: Option<GeneratorConfig>,
    pub capture: Option<CaptureConfig>,
    pub target: TargetConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_posts_per_hour")]
    pub posts_per_hour: u32,
    pub activity_log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_trending_url")]
    pub trending_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            trending_url: default_trending_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_generator_host")]
    pub host: String,
    #[serde(default = "default_generator_port")]
    pub port: u16,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_browser")]
    pub browser: String,
    pub output_dir: String,
    #[serde(default = "default_capture_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub instance: String,
    pub token_file: String,
    #[serde(default = "default_char_limit")]
    pub post_char_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_jitter_max_secs")]
    pub jitter_max_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            jitter_max_secs: default_jitter_max_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.jitter_max_secs),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub media_failure_policy: MediaFailurePolicy,
}

fn default_posts_per_hour() -> u32 {
    4
}

fn default_trending_url() -> String {
    DEFAULT_TRENDING_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_generator_host() -> String {
    "http://localhost".to_string()
}

fn default_generator_port() -> u16 {
    11434
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_capture_timeout() -> u64 {
    60
}

fn default_char_limit() -> usize {
    500
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    15
}

fn default_jitter_max_secs() -> u64 {
    3
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            agent: AgentConfig {
                posts_per_hour: default_posts_per_hour(),
                activity_log: "~/.local/share/repocast/activity.jsonl".to_string(),
            },
            feed: FeedConfig::default(),
            generator: Some(GeneratorConfig {
                enabled: true,
                host: default_generator_host(),
                port: default_generator_port(),
                model: "deepseek-coder".to_string(),
            }),
            capture: Some(CaptureConfig {
                enabled: true,
                browser: default_browser(),
                output_dir: "~/.local/share/repocast/captures".to_string(),
                timeout_secs: default_capture_timeout(),
            }),
            target: TargetConfig {
                instance: "mastodon.social".to_string(),
                token_file: "~/.config/repocast/target.token".to_string(),
                post_char_limit: default_char_limit(),
            },
            retry: RetryConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("REPOCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("repocast").join("config.toml"))
}

/// Expand a configured path (`~` and environment-free)
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
