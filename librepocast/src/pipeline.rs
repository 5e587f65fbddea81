//! The publish pipeline
//!
//! One iteration moves at most one candidate through
//! select → generate → capture → upload → post → reply → record.
//!
//! Failure routing: authoritative rate-limit rejections wait out the
//! server's reset signal; transient errors back off up to the retry cap;
//! capture and generation failures are absorbed locally; media-upload
//! failures follow the configured policy; fatal errors abandon the candidate
//! loudly. A candidate is marked published only after the primary post id is
//! known.

use std::path::PathBuf;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::activity_log::ActivityLog;
use crate::capture::MediaCapture;
use crate::dedup::DedupStore;
use crate::error::{Result, TargetError};
use crate::feed::FeedSource;
use crate::generator::{fallback_content, validate, ContentGenerator};
use crate::rate_limit::RateLimitTracker;
use crate::retry::RetryPolicy;
use crate::target::{post_with_retry, upload_with_retry, PublishTarget};
use crate::types::{Candidate, LogEntry, PostRequest, PublishAttempt};

/// What to do with a candidate when its media upload ultimately fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFailurePolicy {
    /// Publish text-only; media is cosmetic
    #[default]
    Degrade,
    /// Give the candidate up; it stays eligible for a later iteration
    Abort,
}

/// Terminal result of one pipeline iteration.
#[derive(Debug)]
pub enum IterationOutcome {
    /// A publish was confirmed and durably recorded
    Published(LogEntry),
    /// The feed produced nothing usable this cycle
    NoCandidates,
    /// Every fetched candidate has already been published
    AllSeen,
    /// The candidate was given up; nothing was recorded, it stays eligible
    Abandoned {
        candidate_id: String,
        reason: String,
    },
}

pub struct PublishPipeline {
    feed: Box<dyn FeedSource>,
    generator: Option<Box<dyn ContentGenerator>>,
    capture: Option<Box<dyn MediaCapture>>,
    target: Box<dyn PublishTarget>,
    log: ActivityLog,
    dedup: DedupStore,
    limits: RateLimitTracker,
    retry: RetryPolicy,
    media_policy: MediaFailurePolicy,
    /// Whether the most recent fetch yielded any candidates at all, so an
    /// empty selection can be told apart from an all-published one
    last_cycle_had_candidates: bool,
}

impl PublishPipeline {
    pub fn new(
        feed: Box<dyn FeedSource>,
        target: Box<dyn PublishTarget>,
        log: ActivityLog,
        dedup: DedupStore,
    ) -> Self {
        Self {
            feed,
            generator: None,
            capture: None,
            target,
            log,
            dedup,
            limits: RateLimitTracker::new(),
            retry: RetryPolicy::default(),
            media_policy: MediaFailurePolicy::default(),
            last_cycle_had_candidates: false,
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_capture(mut self, capture: Box<dyn MediaCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_media_policy(mut self, policy: MediaFailurePolicy) -> Self {
        self.media_policy = policy;
        self
    }

    pub fn with_tracker(mut self, limits: RateLimitTracker) -> Self {
        self.limits = limits;
        self
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn limits(&self) -> &RateLimitTracker {
        &self.limits
    }

    /// Run one full iteration: at most one candidate, processed to a
    /// terminal outcome. Never publishes the same candidate id twice.
    pub async fn run_iteration(&mut self) -> Result<IterationOutcome> {
        let Some(candidate) = self.select_candidate().await? else {
            return Ok(self.empty_outcome());
        };
        info!("Selected candidate: {}", candidate.id);

        let content = self.generate_content(&candidate).await;
        let mut attempt = PublishAttempt::new(candidate, content);
        attempt.media_path = self.capture_media(&attempt.candidate).await;

        let media_ref = match self.upload_media(&attempt).await {
            Ok(media_ref) => media_ref,
            Err(reason) => {
                return Ok(IterationOutcome::Abandoned {
                    candidate_id: attempt.candidate.id,
                    reason,
                })
            }
        };

        let primary = PostRequest {
            text: attempt.content.clone(),
            media_ref: media_ref.clone(),
            reply_to: None,
        };
        let receipt = match post_with_retry(&*self.target, &mut self.limits, &self.retry, &primary)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                if matches!(e, TargetError::Fatal(_)) {
                    error!("Fatal error posting {}: {}", attempt.candidate.id, e);
                } else {
                    warn!("Giving up on {}: {}", attempt.candidate.id, e);
                }
                return Ok(IterationOutcome::Abandoned {
                    candidate_id: attempt.candidate.id,
                    reason: e.to_string(),
                });
            }
        };
        info!("Primary post created: {}", receipt.post_id);

        // The linked reply is supplementary; the primary post is the success
        // criterion and is never rolled back.
        let reply = PostRequest {
            text: format!("🔗 {}", attempt.candidate.id),
            media_ref: None,
            reply_to: Some(receipt.post_id.clone()),
        };
        if let Err(e) = post_with_retry(&*self.target, &mut self.limits, &self.retry, &reply).await
        {
            warn!("Linked post for {} failed: {}", attempt.candidate.id, e);
        }

        let entry = self.record_success(&attempt, media_ref, &receipt.post_id)?;
        Ok(IterationOutcome::Published(entry))
    }

    /// Fetch the feed and draw uniformly from the unpublished subset.
    /// `Ok(None)` means there is nothing to publish this cycle; call
    /// [`Self::empty_outcome`] for the reason.
    async fn select_candidate(&mut self) -> Result<Option<Candidate>> {
        let candidates = match self.feed.fetch().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Feed fetch failed, no candidates this cycle: {}", e);
                self.last_cycle_had_candidates = false;
                return Ok(None);
            }
        };

        if candidates.is_empty() {
            self.last_cycle_had_candidates = false;
            return Ok(None);
        }
        self.last_cycle_had_candidates = true;

        let fresh: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !self.dedup.contains(&c.id))
            .collect();

        Ok(fresh.choose(&mut rand::thread_rng()).cloned())
    }

    fn empty_outcome(&self) -> IterationOutcome {
        if self.last_cycle_had_candidates {
            IterationOutcome::AllSeen
        } else {
            IterationOutcome::NoCandidates
        }
    }

    async fn generate_content(&self, candidate: &Candidate) -> String {
        let limit = self.target.character_limit();
        if let Some(generator) = &self.generator {
            match generator.generate(candidate).await {
                Ok(content) => match validate(&content, limit) {
                    Ok(()) => return content,
                    Err(e) => warn!("Generated content rejected ({}), using fallback", e),
                },
                Err(e) => warn!("Content generation failed ({}), using fallback", e),
            }
        }
        fallback_content(candidate, limit)
    }

    async fn capture_media(&self, candidate: &Candidate) -> Option<PathBuf> {
        let capture = self.capture.as_ref()?;
        match capture.capture(candidate).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Media capture failed ({}), publishing text-only", e);
                None
            }
        }
    }

    /// Upload the attempt's media, if any. `Err(reason)` means the candidate
    /// must be abandoned (abort policy only).
    async fn upload_media(
        &mut self,
        attempt: &PublishAttempt,
    ) -> std::result::Result<Option<String>, String> {
        let Some(path) = &attempt.media_path else {
            return Ok(None);
        };

        match upload_with_retry(&*self.target, &mut self.limits, &self.retry, path).await {
            Ok(upload) => Ok(Some(upload.media_ref)),
            Err(e) => {
                if matches!(e, TargetError::Fatal(_)) {
                    error!("Fatal media upload error for {}: {}", attempt.candidate.id, e);
                }
                match self.media_policy {
                    MediaFailurePolicy::Degrade => {
                        warn!(
                            "Media upload for {} failed ({}), degrading to text-only",
                            attempt.candidate.id, e
                        );
                        Ok(None)
                    }
                    MediaFailurePolicy::Abort => Err(format!("media upload failed: {}", e)),
                }
            }
        }
    }

    /// Mark the candidate seen, then append the durable record. `record` runs
    /// only here, after the primary post id is known.
    fn record_success(
        &mut self,
        attempt: &PublishAttempt,
        media_ref: Option<String>,
        post_id: &str,
    ) -> Result<LogEntry> {
        self.dedup.record(&attempt.candidate.id);

        let entry = LogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            candidate_id: attempt.candidate.id.clone(),
            content: attempt.content.clone(),
            media_ref,
            post_id: post_id.to_string(),
        };
        self.log.append(&entry)?;

        info!("Recorded publish of {} as {}", attempt.candidate.id, post_id);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_failure_policy_default() {
        assert_eq!(MediaFailurePolicy::default(), MediaFailurePolicy::Degrade);
    }

    #[test]
    fn test_media_failure_policy_serde() {
        let degrade: MediaFailurePolicy = serde_json::from_str("\"degrade\"").unwrap();
        assert_eq!(degrade, MediaFailurePolicy::Degrade);

        let abort: MediaFailurePolicy = serde_json::from_str("\"abort\"").unwrap();
        assert_eq!(abort, MediaFailurePolicy::Abort);

        assert!(serde_json::from_str::<MediaFailurePolicy>("\"panic\"").is_err());
    }
}
