//! Core types for Repocast

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rate_limit::RateLimitState;

/// One feed item eligible for publication.
///
/// The canonical URL is the stable unique key used for deduplication across
/// the process's entire history. Candidates are created per pipeline
/// iteration and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Canonical URL of the repository
    pub id: String,
    /// `owner/name` short form
    pub name: String,
    pub description: String,
    pub stars: u32,
    pub language: Option<String>,
}

/// Ephemeral record of a single pipeline run.
#[derive(Debug, Clone)]
pub struct PublishAttempt {
    pub id: String,
    pub candidate: Candidate,
    pub content: String,
    pub media_path: Option<std::path::PathBuf>,
}

impl PublishAttempt {
    pub fn new(candidate: Candidate, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            candidate,
            content,
            media_path: None,
        }
    }
}

/// Durable record of one confirmed publish.
///
/// Appended to the activity log exactly once per success, never mutated or
/// deleted. The dedup set is rebuilt from these entries on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub candidate_id: String,
    pub content: String,
    pub media_ref: Option<String>,
    pub post_id: String,
}

/// Request for a single post on the publish target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRequest {
    pub text: String,
    pub media_ref: Option<String>,
    /// Post id of the primary post when this is a linked follow-up
    pub reply_to: Option<String>,
}

/// Successful media upload, with the rate-limit snapshot the response carried.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub media_ref: String,
    pub rate_limit: Option<RateLimitState>,
}

/// Successful post creation, with the rate-limit snapshot the response carried.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub post_id: String,
    pub rate_limit: Option<RateLimitState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            id: "https://github.com/rust-lang/rust".to_string(),
            name: "rust-lang/rust".to_string(),
            description: "Empowering everyone to build reliable software".to_string(),
            stars: 95000,
            language: Some("Rust".to_string()),
        }
    }

    #[test]
    fn test_publish_attempt_unique_ids() {
        let attempt1 = PublishAttempt::new(candidate(), "post one".to_string());
        let attempt2 = PublishAttempt::new(candidate(), "post two".to_string());

        assert!(Uuid::parse_str(&attempt1.id).is_ok());
        assert_ne!(attempt1.id, attempt2.id);
        assert_eq!(attempt1.media_path, None);
    }

    #[test]
    fn test_candidate_serialization() {
        let candidate = candidate();
        let json = serde_json::to_string(&candidate).unwrap();
        let deserialized: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, candidate);
    }

    #[test]
    fn test_log_entry_round_trip() {
        let entry = LogEntry {
            timestamp: 1_700_000_000,
            candidate_id: "https://github.com/rust-lang/rust".to_string(),
            content: "Worth a look".to_string(),
            media_ref: Some("media-42".to_string()),
            post_id: "1234567890".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, entry);
    }

    #[test]
    fn test_log_entry_without_media() {
        let entry = LogEntry {
            timestamp: 1_700_000_000,
            candidate_id: "https://github.com/serde-rs/serde".to_string(),
            content: "Text only".to_string(),
            media_ref: None,
            post_id: "42".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"media_ref\":null"));
        let deserialized: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.media_ref, None);
    }

    #[test]
    fn test_post_request_default() {
        let request = PostRequest::default();
        assert!(request.text.is_empty());
        assert_eq!(request.media_ref, None);
        assert_eq!(request.reply_to, None);
    }
}
