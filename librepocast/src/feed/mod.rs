//! Candidate feed abstraction

use async_trait::async_trait;

use crate::error::FeedError;
use crate::types::Candidate;

pub mod trending;

/// Source of publishable candidates.
///
/// May return an empty list. A failed fetch means "no candidates this
/// cycle" to the caller, never a dead agent.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Candidate>, FeedError>;
}
