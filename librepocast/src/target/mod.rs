//! Publish target abstraction
//!
//! The target exposes two quota-governed operations: media upload and post
//! creation. The retrying call helpers here wrap both with the full failure
//! protocol: advisory pacing from the tracker before each call, wholesale
//! state refresh from successful responses, re-synchronization from
//! authoritative rejections, and capped exponential backoff for transient
//! errors.

use std::path::Path;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::TargetError;
use crate::rate_limit::{Endpoint, RateLimitTracker};
use crate::retry::RetryPolicy;
use crate::types::{MediaUpload, PostReceipt, PostRequest};

pub mod mastodon;

// Mock target is available for all builds (not just tests) to support
// integration tests.
pub mod mock;

#[async_trait]
pub trait PublishTarget: Send + Sync {
    /// Upload a media file, returning a reference usable in `create_post`.
    async fn upload_media(&self, path: &Path) -> Result<MediaUpload, TargetError>;

    /// Create a post. `reply_to` chains a follow-up onto an earlier post.
    async fn create_post(&self, request: &PostRequest) -> Result<PostReceipt, TargetError>;

    /// Lowercase identifier for the target (e.g., "mastodon")
    fn name(&self) -> &str;

    /// Maximum characters per post
    fn character_limit(&self) -> usize {
        500
    }
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Suspend until the endpoint has budget again.
async fn pace(limits: &RateLimitTracker, endpoint: Endpoint) {
    if !limits.has_budget(endpoint) {
        let wait = limits.wait_duration(endpoint, now_ts());
        info!("No budget left on {}, waiting {:?}", endpoint, wait);
        sleep(wait).await;
    }
}

/// Upload media with quota pacing and retry.
///
/// Rate-limit rejections re-synchronize the tracker from the rejection's own
/// reset signal and do not count against the transient cap. Transient errors
/// back off exponentially; after `max_attempts` total calls the last error is
/// returned. Fatal errors are returned immediately.
pub async fn upload_with_retry(
    target: &dyn PublishTarget,
    limits: &mut RateLimitTracker,
    retry: &RetryPolicy,
    path: &Path,
) -> Result<MediaUpload, TargetError> {
    let mut attempt = 1;
    loop {
        pace(limits, Endpoint::MediaUpload).await;
        match target.upload_media(path).await {
            Ok(upload) => {
                limits.update(Endpoint::MediaUpload, upload.rate_limit.as_ref());
                return Ok(upload);
            }
            Err(TargetError::RateLimited { endpoint, reset_at }) => {
                limits.mark_exhausted(endpoint, reset_at);
                let wait = retry.reject_wait(
                    limits.wait_duration(endpoint, now_ts()),
                    &mut rand::thread_rng(),
                );
                warn!("Rate limited on {}, retrying upload in {:?}", endpoint, wait);
                sleep(wait).await;
            }
            Err(TargetError::Transient(reason)) if attempt < retry.max_attempts => {
                let delay = retry.backoff_delay(attempt - 1, &mut rand::thread_rng());
                warn!(
                    "Transient upload error (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, retry.max_attempts, reason, delay
                );
                attempt += 1;
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Create a post with quota pacing and retry. Same protocol as
/// [`upload_with_retry`], against the `post_create` endpoint.
pub async fn post_with_retry(
    target: &dyn PublishTarget,
    limits: &mut RateLimitTracker,
    retry: &RetryPolicy,
    request: &PostRequest,
) -> Result<PostReceipt, TargetError> {
    let mut attempt = 1;
    loop {
        pace(limits, Endpoint::PostCreate).await;
        match target.create_post(request).await {
            Ok(receipt) => {
                limits.update(Endpoint::PostCreate, receipt.rate_limit.as_ref());
                if attempt > 1 {
                    info!("Post created on attempt {}", attempt);
                }
                return Ok(receipt);
            }
            Err(TargetError::RateLimited { endpoint, reset_at }) => {
                limits.mark_exhausted(endpoint, reset_at);
                let wait = retry.reject_wait(
                    limits.wait_duration(endpoint, now_ts()),
                    &mut rand::thread_rng(),
                );
                warn!("Rate limited on {}, retrying post in {:?}", endpoint, wait);
                sleep(wait).await;
            }
            Err(TargetError::Transient(reason)) if attempt < retry.max_attempts => {
                let delay = retry.backoff_delay(attempt - 1, &mut rand::thread_rng());
                warn!(
                    "Transient post error (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, retry.max_attempts, reason, delay
                );
                attempt += 1;
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTarget;
    use super::*;
    use crate::rate_limit::RateLimitState;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(1), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_post_with_retry_first_attempt() {
        let target = MockTarget::new();
        let mut limits = RateLimitTracker::with_margin(0);

        let receipt = post_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            &PostRequest {
                text: "hello".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(receipt.post_id, "post-1");
        assert_eq!(target.post_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_post_with_retry_recovers_from_transient() {
        let target = MockTarget::new();
        target.fail_posts_with(vec![
            TargetError::Transient("one".to_string()),
            TargetError::Transient("two".to_string()),
        ]);
        let mut limits = RateLimitTracker::with_margin(0);

        let receipt = post_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            &PostRequest::default(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.post_id, "post-1");
        assert_eq!(target.post_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_post_with_retry_gives_up_after_cap() {
        let target = MockTarget::new();
        target.fail_posts_with(vec![TargetError::Transient("down".to_string()); 5]);
        let mut limits = RateLimitTracker::with_margin(0);

        let result = post_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            &PostRequest::default(),
        )
        .await;

        assert!(matches!(result, Err(TargetError::Transient(_))));
        assert_eq!(target.post_calls().len(), 5);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let target = MockTarget::new();
        target.fail_posts_with(vec![TargetError::Fatal("forbidden".to_string())]);
        let mut limits = RateLimitTracker::with_margin(0);

        let result = post_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            &PostRequest::default(),
        )
        .await;

        assert!(matches!(result, Err(TargetError::Fatal(_))));
        assert_eq!(target.post_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_rejection_resyncs_and_retries() {
        let target = MockTarget::new();
        // reset_at in the past so the jittered wait collapses to zero
        target.fail_posts_with(vec![TargetError::RateLimited {
            endpoint: Endpoint::PostCreate,
            reset_at: 0,
        }]);
        let mut limits = RateLimitTracker::with_margin(0);

        let receipt = post_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            &PostRequest::default(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.post_id, "post-1");
        assert_eq!(target.post_calls().len(), 2);
        // The rejection overwrote the tracker; the success response carried
        // no headers, so that state must persist.
        assert_eq!(limits.state(Endpoint::PostCreate).unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn test_success_refreshes_tracker_wholesale() {
        let target = MockTarget::new();
        target.respond_with_rate_limit(RateLimitState {
            limit: 50,
            remaining: 12,
            reset_at: 9_999,
        });
        let mut limits = RateLimitTracker::with_margin(0);

        upload_with_retry(
            &target,
            &mut limits,
            &fast_retry(),
            Path::new("/tmp/shot.png"),
        )
        .await
        .unwrap();

        let state = limits.state(Endpoint::MediaUpload).unwrap();
        assert_eq!(state.limit, 50);
        assert_eq!(state.remaining, 12);
        assert_eq!(state.reset_at, 9_999);
    }
}
