//! Repocast - an unattended publishing agent for trending repositories
//!
//! This library provides the publish pipeline core (rate-limit tracking,
//! deduplication, retry policy, and the ordered publish transaction) plus
//! the collaborator traits and implementations around it: feed scraping,
//! content generation, media capture, and the publish target.

pub mod activity_log;
pub mod capture;
pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod generator;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod retry;
pub mod target;
pub mod types;

// Re-export commonly used types
pub use activity_log::ActivityLog;
pub use config::Config;
pub use dedup::DedupStore;
pub use error::{RepocastError, Result};
pub use pipeline::{IterationOutcome, MediaFailurePolicy, PublishPipeline};
pub use rate_limit::{Endpoint, RateLimitState, RateLimitTracker};
pub use retry::RetryPolicy;
pub use types::{Candidate, LogEntry};
