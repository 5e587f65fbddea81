//! Headless-browser screenshot capture
//!
//! Shells out to a Chromium-compatible browser in headless mode. The capture
//! fails (and the pipeline degrades) if the command errors, times out, or
//! leaves no screenshot behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::error::CaptureError;
use crate::types::Candidate;

use super::MediaCapture;

/// Tall viewport so the capture reaches into the README
const WINDOW_SIZE: &str = "1280,2000";

pub struct BrowserCapture {
    browser: String,
    output_dir: PathBuf,
    timeout_secs: u64,
}

impl BrowserCapture {
    pub fn new(browser: impl Into<String>, output_dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            browser: browser.into(),
            output_dir: output_dir.into(),
            timeout_secs,
        }
    }

    fn output_path(&self, candidate: &Candidate) -> PathBuf {
        let slug = candidate
            .id
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("capture");
        self.output_dir
            .join(format!("{}_{}.png", slug, chrono::Utc::now().timestamp()))
    }
}

#[async_trait]
impl MediaCapture for BrowserCapture {
    async fn capture(&self, candidate: &Candidate) -> Result<PathBuf, CaptureError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| CaptureError::Command(format!("Failed to create capture dir: {}", e)))?;

        let path = self.output_path(candidate);
        debug!("Capturing {} to {}", candidate.id, path.display());

        let run = Command::new(&self.browser)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!("--window-size={}", WINDOW_SIZE))
            .arg(format!("--screenshot={}", path.display()))
            .arg(&candidate.id)
            .output();

        let output = timeout(Duration::from_secs(self.timeout_secs), run)
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout_secs))?
            .map_err(|e| CaptureError::Command(format!("Failed to run {}: {}", self.browser, e)))?;

        if !output.status.success() {
            return Err(CaptureError::Command(format!(
                "{} exited with {}",
                self.browser, output.status
            )));
        }

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| CaptureError::Command(format!("Screenshot missing: {}", e)))?;
        if metadata.len() == 0 {
            return Err(CaptureError::Command("Screenshot file is empty".to_string()));
        }

        Ok(path)
    }
}
