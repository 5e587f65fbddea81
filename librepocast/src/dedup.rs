//! Deduplication of published candidates
//!
//! A candidate id is published at most once for the lifetime of the activity
//! log. The set is rebuilt from the log once at startup and only ever grows.

use std::collections::HashSet;

use tracing::info;

use crate::activity_log::ActivityLog;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the set from the activity log. Called once at initialization.
    pub fn load(log: &ActivityLog) -> Result<Self> {
        let seen: HashSet<String> = log
            .replay()?
            .into_iter()
            .map(|entry| entry.candidate_id)
            .collect();
        info!("Loaded {} published candidate(s) from activity log", seen.len());
        Ok(Self { seen })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Idempotent insert. Must only be called once a publish has been
    /// durably confirmed with a post id, never speculatively.
    pub fn record(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
