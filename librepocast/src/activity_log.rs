//! Append-only activity log
//!
//! Each confirmed publish appends exactly one JSON line. The log is never
//! rewritten and doubles as crash-recovery state: the dedup set is rebuilt
//! from it at startup. Each entry goes out in a single `write_all`, so a
//! crash cannot leave an interleaved partial entry.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{LogError, Result};
use crate::types::LogEntry;

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    /// Open (or prepare to create) the log at `path`, creating parent
    /// directories as needed. The file itself is created on first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(LogError::Io)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).map_err(LogError::Encode)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(LogError::Io)?;
        file.write_all(line.as_bytes()).map_err(LogError::Io)?;
        file.flush().map_err(LogError::Io)?;
        Ok(())
    }

    /// Replay all entries in append order.
    ///
    /// A missing file yields an empty history. Malformed lines are skipped
    /// with a warning; a damaged log must not prevent startup.
    pub fn replay(&self) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(LogError::Io)?;
        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(LogError::Io)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed activity log line {}: {}", lineno + 1, e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(candidate_id: &str, post_id: &str) -> LogEntry {
        LogEntry {
            timestamp: 1_700_000_000,
            candidate_id: candidate_id.to_string(),
            content: "content".to_string(),
            media_ref: None,
            post_id: post_id.to_string(),
        }
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = ActivityLog::open(temp.path().join("activity.jsonl")).unwrap();
        assert!(log.replay().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_replay_round_trip() {
        let temp = TempDir::new().unwrap();
        let log = ActivityLog::open(temp.path().join("activity.jsonl")).unwrap();

        let first = entry("https://github.com/a/b", "1");
        let second = entry("https://github.com/c/d", "2");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let entries = log.replay().unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[test]
    fn test_replay_preserves_append_order() {
        let temp = TempDir::new().unwrap();
        let log = ActivityLog::open(temp.path().join("activity.jsonl")).unwrap();

        for i in 0..10 {
            log.append(&entry(&format!("https://github.com/r/{}", i), &i.to_string()))
                .unwrap();
        }

        let entries = log.replay().unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.post_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity.jsonl");
        let log = ActivityLog::open(&path).unwrap();

        log.append(&entry("https://github.com/a/b", "1")).unwrap();
        // Simulate a corrupted line between two valid entries
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"{\"broken\": tru\n").unwrap();
        }
        log.append(&entry("https://github.com/c/d", "2")).unwrap();

        let entries = log.replay().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].post_id, "1");
        assert_eq!(entries[1].post_id, "2");
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("deeper").join("activity.jsonl");
        let log = ActivityLog::open(&path).unwrap();
        log.append(&entry("https://github.com/a/b", "1")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity.jsonl");

        {
            let log = ActivityLog::open(&path).unwrap();
            log.append(&entry("https://github.com/a/b", "1")).unwrap();
        }

        let reopened = ActivityLog::open(&path).unwrap();
        assert_eq!(reopened.replay().unwrap().len(), 1);
    }
}
