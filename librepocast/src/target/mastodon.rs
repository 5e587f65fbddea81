//! Mastodon-compatible publish target
//!
//! Speaks the Mastodon REST API directly through reqwest so the
//! `X-RateLimit-*` response headers stay visible to the rate-limit tracker.
//! Works against any server implementing the Mastodon status and media
//! endpoints.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;

use crate::config::TargetConfig;
use crate::error::TargetError;
use crate::rate_limit::{Endpoint, RateLimitState};
use crate::types::{MediaUpload, PostReceipt, PostRequest};

use super::PublishTarget;

/// Fallback reset horizon when a 429 carries no usable reset header.
const DEFAULT_RESET_SECS: i64 = 60;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct MastodonTarget {
    client: Client,
    base_url: String,
    token: String,
    character_limit: usize,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
}

impl MastodonTarget {
    pub fn new(
        instance: &str,
        token: String,
        character_limit: usize,
    ) -> Result<Self, TargetError> {
        let base_url = if instance.starts_with("http://") || instance.starts_with("https://") {
            instance.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", instance.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TargetError::Fatal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: token.trim().to_string(),
            character_limit,
        })
    }

    /// Build a target from configuration, reading the access token from the
    /// configured token file.
    pub fn from_config(config: &TargetConfig) -> Result<Self, TargetError> {
        let token_path = shellexpand::tilde(&config.token_file).to_string();
        let token = std::fs::read_to_string(&token_path).map_err(|e| {
            TargetError::Fatal(format!(
                "Failed to read target token file {}: {}",
                token_path, e
            ))
        })?;

        if token.trim().is_empty() {
            return Err(TargetError::Fatal(format!(
                "Target token file {} is empty",
                token_path
            )));
        }

        Self::new(&config.instance, token, config.post_char_limit)
    }
}

/// Parse the `X-RateLimit-*` trio into a snapshot. Any missing or unparsable
/// header yields `None`, which leaves prior tracker state untouched.
fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitState> {
    let limit = header_u32(headers, "x-ratelimit-limit")?;
    let remaining = header_u32(headers, "x-ratelimit-remaining")?;
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_reset)?;

    Some(RateLimitState {
        limit,
        remaining,
        reset_at,
    })
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}

/// Mastodon sends the reset as RFC 3339; some compatible servers send epoch
/// seconds.
fn parse_reset(value: &str) -> Option<i64> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value.trim()) {
        return Some(datetime.timestamp());
    }
    value.trim().parse::<i64>().ok()
}

/// Map a non-success response to the error taxonomy.
fn classify_failure(
    endpoint: Endpoint,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> TargetError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_reset)
            .unwrap_or_else(|| chrono::Utc::now().timestamp() + DEFAULT_RESET_SECS);
        return TargetError::RateLimited { endpoint, reset_at };
    }

    match status.as_u16() {
        401 | 403 | 404 | 422 => {
            TargetError::Fatal(format!("{} rejected with {}: {}", endpoint, status, body))
        }
        _ => TargetError::Transient(format!("{} failed with {}: {}", endpoint, status, body)),
    }
}

#[async_trait]
impl PublishTarget for MastodonTarget {
    async fn upload_media(&self, path: &Path) -> Result<MediaUpload, TargetError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TargetError::Transient(format!("Failed to read media file {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.png".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| TargetError::Fatal(format!("Invalid media part: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/v2/media", self.base_url))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TargetError::Transient(format!("Media upload request failed: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = parse_rate_limit(&headers);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(
                Endpoint::MediaUpload,
                status,
                &headers,
                &body,
            ));
        }

        let media: MediaResponse = response.json().await.map_err(|e| {
            TargetError::Transient(format!("Media upload response parse failed: {}", e))
        })?;

        Ok(MediaUpload {
            media_ref: media.id,
            rate_limit,
        })
    }

    async fn create_post(&self, request: &PostRequest) -> Result<PostReceipt, TargetError> {
        let mut body = serde_json::json!({ "status": request.text });
        if let Some(media_ref) = &request.media_ref {
            body["media_ids"] = serde_json::json!([media_ref]);
        }
        if let Some(reply_to) = &request.reply_to {
            body["in_reply_to_id"] = serde_json::json!(reply_to);
        }

        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TargetError::Transient(format!("Post request failed: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = parse_rate_limit(&headers);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(
                Endpoint::PostCreate,
                status,
                &headers,
                &body,
            ));
        }

        let posted: StatusResponse = response
            .json()
            .await
            .map_err(|e| TargetError::Transient(format!("Post response parse failed: {}", e)))?;

        Ok(PostReceipt {
            post_id: posted.id,
            rate_limit,
        })
    }

    fn name(&self) -> &str {
        "mastodon"
    }

    fn character_limit(&self) -> usize {
        self.character_limit
    }
}
