//! Mock publish target for tests
//!
//! Scripted failures are consumed front-first, then calls succeed. Clones
//! share state, so tests can keep a handle for assertions after boxing the
//! mock into a pipeline.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::TargetError;
use crate::rate_limit::RateLimitState;
use crate::types::{MediaUpload, PostReceipt, PostRequest};

use super::PublishTarget;

#[derive(Clone)]
pub struct MockTarget {
    /// Outcomes for upcoming `upload_media` calls, front first; `None` is a
    /// success, an exhausted script always succeeds
    upload_script: Arc<Mutex<VecDeque<Option<TargetError>>>>,
    /// Outcomes for upcoming `create_post` calls, front first
    post_script: Arc<Mutex<VecDeque<Option<TargetError>>>>,
    /// Rate-limit snapshot attached to successful responses
    rate_limit: Arc<Mutex<Option<RateLimitState>>>,
    upload_calls: Arc<Mutex<usize>>,
    post_calls: Arc<Mutex<Vec<PostRequest>>>,
    counter: Arc<Mutex<usize>>,
    character_limit: usize,
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            upload_script: Arc::new(Mutex::new(VecDeque::new())),
            post_script: Arc::new(Mutex::new(VecDeque::new())),
            rate_limit: Arc::new(Mutex::new(None)),
            upload_calls: Arc::new(Mutex::new(0)),
            post_calls: Arc::new(Mutex::new(Vec::new())),
            counter: Arc::new(Mutex::new(0)),
            character_limit: 500,
        }
    }

    pub fn with_character_limit(mut self, limit: usize) -> Self {
        self.character_limit = limit;
        self
    }

    /// Queue errors for upcoming `upload_media` calls.
    pub fn fail_uploads_with(&self, errors: impl IntoIterator<Item = TargetError>) {
        self.upload_script
            .lock()
            .unwrap()
            .extend(errors.into_iter().map(Some));
    }

    /// Queue errors for upcoming `create_post` calls.
    pub fn fail_posts_with(&self, errors: impl IntoIterator<Item = TargetError>) {
        self.post_script
            .lock()
            .unwrap()
            .extend(errors.into_iter().map(Some));
    }

    /// Queue `count` successful `create_post` responses ahead of whatever is
    /// scripted next.
    pub fn succeed_posts(&self, count: usize) {
        self.post_script
            .lock()
            .unwrap()
            .extend(std::iter::repeat_with(|| None).take(count));
    }

    /// Attach a rate-limit snapshot to every successful response.
    pub fn respond_with_rate_limit(&self, snapshot: RateLimitState) {
        *self.rate_limit.lock().unwrap() = Some(snapshot);
    }

    /// Number of `upload_media` calls, including failed ones.
    pub fn upload_calls(&self) -> usize {
        *self.upload_calls.lock().unwrap()
    }

    /// All `create_post` requests received, including failed ones.
    pub fn post_calls(&self) -> Vec<PostRequest> {
        self.post_calls.lock().unwrap().clone()
    }

    /// Total publish-target calls of either kind.
    pub fn total_calls(&self) -> usize {
        self.upload_calls() + self.post_calls.lock().unwrap().len()
    }

    fn next_id(&self) -> usize {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        *counter
    }
}

#[async_trait]
impl PublishTarget for MockTarget {
    async fn upload_media(&self, _path: &Path) -> Result<MediaUpload, TargetError> {
        *self.upload_calls.lock().unwrap() += 1;
        if let Some(Some(error)) = self.upload_script.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(MediaUpload {
            media_ref: format!("media-{}", self.next_id()),
            rate_limit: *self.rate_limit.lock().unwrap(),
        })
    }

    async fn create_post(&self, request: &PostRequest) -> Result<PostReceipt, TargetError> {
        self.post_calls.lock().unwrap().push(request.clone());
        if let Some(Some(error)) = self.post_script.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(PostReceipt {
            post_id: format!("post-{}", self.next_id()),
            rate_limit: *self.rate_limit.lock().unwrap(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn character_limit(&self) -> usize {
        self.character_limit
    }
}
