//! Error types for Repocast

use thiserror::Error;

use crate::rate_limit::Endpoint;

pub type Result<T> = std::result::Result<T, RepocastError>;

#[derive(Error, Debug)]
pub enum RepocastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Activity log error: {0}")]
    Log(#[from] LogError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Content generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Media capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Publish target error: {0}")]
    Target(#[from] TargetError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RepocastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RepocastError::InvalidInput(_) => 3,
            RepocastError::Target(TargetError::Fatal(_)) => 2,
            _ => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Activity log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(String),

    #[error("Feed page did not match the expected structure: {0}")]
    Structure(String),
}

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Generator backend failed: {0}")]
    Backend(String),

    #[error("Generated content rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone)]
pub enum CaptureError {
    #[error("Capture command failed: {0}")]
    Command(String),

    #[error("Capture timed out after {0}s")]
    Timeout(u64),
}

/// Failure classes reported by the publish target.
///
/// `RateLimited` carries the server's own reset signal and is always retried
/// without counting against the transient cap. `Transient` is retried with
/// backoff up to the cap. `Fatal` is never retried.
#[derive(Error, Debug, Clone)]
pub enum TargetError {
    #[error("Rate limited on {endpoint}, resets at {reset_at}")]
    RateLimited { endpoint: Endpoint, reset_at: i64 },

    #[error("Transient API error: {0}")]
    Transient(String),

    #[error("Fatal API error: {0}")]
    Fatal(String),
}
