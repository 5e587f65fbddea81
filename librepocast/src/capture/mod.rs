//! Media capture abstraction

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::CaptureError;
use crate::types::Candidate;

pub mod browser;

/// Captures an image for a candidate.
///
/// Best-effort: the pipeline degrades to a text-only publish when capture
/// fails, so implementations report errors instead of papering over them.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn capture(&self, candidate: &Candidate) -> Result<PathBuf, CaptureError>;
}
