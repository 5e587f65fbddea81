//! Per-endpoint rate limit tracking
//!
//! Quota state comes exclusively from the publish target's responses. The
//! tracker never invents values: absent headers leave prior state untouched,
//! and an endpoint the server has said nothing about is assumed to have
//! budget. Pacing from this state is advisory; the server remains the final
//! authority.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds added to every reset wait to absorb clock skew.
const DEFAULT_SAFETY_MARGIN_SECS: i64 = 2;

/// Quota-governed endpoints of the publish target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    MediaUpload,
    PostCreate,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::MediaUpload => "media_upload",
            Endpoint::PostCreate => "post_create",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authoritative quota state for one endpoint, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp at which the window resets
    pub reset_at: i64,
}

/// Tracks quota state per endpoint for the lifetime of the process.
#[derive(Debug)]
pub struct RateLimitTracker {
    states: HashMap<Endpoint, RateLimitState>,
    safety_margin: i64,
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::with_margin(DEFAULT_SAFETY_MARGIN_SECS)
    }

    /// Create a tracker with a specific safety margin in seconds.
    pub fn with_margin(safety_margin: i64) -> Self {
        Self {
            states: HashMap::new(),
            safety_margin,
        }
    }

    /// Overwrite the endpoint state wholesale from a fresh server snapshot.
    ///
    /// `None` means the response carried no rate-limit headers; prior state
    /// is left untouched.
    pub fn update(&mut self, endpoint: Endpoint, snapshot: Option<&RateLimitState>) {
        if let Some(snapshot) = snapshot {
            self.states.insert(endpoint, *snapshot);
        }
    }

    /// Re-synchronize from an authoritative rate-limit rejection.
    pub fn mark_exhausted(&mut self, endpoint: Endpoint, reset_at: i64) {
        let limit = self.states.get(&endpoint).map(|s| s.limit).unwrap_or(0);
        self.states.insert(
            endpoint,
            RateLimitState {
                limit,
                remaining: 0,
                reset_at,
            },
        );
    }

    /// True iff at least one call is left in the current window.
    ///
    /// An endpoint with no recorded state has budget.
    pub fn has_budget(&self, endpoint: Endpoint) -> bool {
        self.states
            .get(&endpoint)
            .map(|s| s.remaining >= 1)
            .unwrap_or(true)
    }

    /// Time to wait until the endpoint's window resets, never negative.
    pub fn wait_duration(&self, endpoint: Endpoint, now: i64) -> Duration {
        match self.states.get(&endpoint) {
            Some(state) => {
                let secs = (state.reset_at - now + self.safety_margin).max(0);
                Duration::from_secs(secs as u64)
            }
            None => Duration::ZERO,
        }
    }

    pub fn state(&self, endpoint: Endpoint) -> Option<&RateLimitState> {
        self.states.get(&endpoint)
    }
}
