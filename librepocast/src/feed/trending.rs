//! GitHub trending page scraper
//!
//! Parses the public trending page into candidates. Items that don't match
//! the expected row structure are skipped; only a page-level failure is a
//! feed error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::types::Candidate;

use super::FeedSource;

pub const DEFAULT_TRENDING_URL: &str = "https://github.com/trending";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const FETCH_TIMEOUT_SECS: u64 = 60;

pub struct TrendingFeed {
    client: Client,
    url: String,
    selectors: RowSelectors,
}

struct RowSelectors {
    row: Selector,
    title: Selector,
    description: Selector,
    language: Selector,
    stars: Selector,
}

impl RowSelectors {
    fn new() -> Self {
        Self {
            row: parse_selector("article.Box-row"),
            title: parse_selector("h2 a"),
            description: parse_selector("p"),
            language: parse_selector("[itemprop=\"programmingLanguage\"]"),
            stars: parse_selector("a[href$=\"/stargazers\"]"),
        }
    }
}

fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector must be valid CSS")
}

impl TrendingFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            selectors: RowSelectors::new(),
        })
    }

    fn parse_page(&self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();
        for row in document.select(&self.selectors.row) {
            match self.parse_row(&row) {
                Some(candidate) => candidates.push(candidate),
                None => warn!("Skipping trending row with unexpected structure"),
            }
        }
        candidates
    }

    fn parse_row(&self, row: &ElementRef) -> Option<Candidate> {
        let title = row.select(&self.selectors.title).next()?;
        let href = title.value().attr("href")?;
        let id = format!("https://github.com{}", href);

        // The anchor text renders as "owner / name" with layout whitespace
        let name = title
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("");

        let description = row
            .select(&self.selectors.description)
            .next()
            .map(|p| p.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let language = row
            .select(&self.selectors.language)
            .next()
            .map(|l| l.text().collect::<String>().trim().to_string())
            .filter(|l| !l.is_empty());

        let stars = row
            .select(&self.selectors.stars)
            .next()
            .map(|a| a.text().collect::<String>())
            .and_then(|text| text.trim().replace(',', "").parse::<u32>().ok())
            .unwrap_or(0);

        Some(Candidate {
            id,
            name,
            description,
            stars,
            language,
        })
    }
}

#[async_trait]
impl FeedSource for TrendingFeed {
    async fn fetch(&self) -> Result<Vec<Candidate>, FeedError> {
        debug!("Fetching trending feed from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Request(format!(
                "trending page returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;

        let candidates = self.parse_page(&body);
        if candidates.is_empty() {
            return Err(FeedError::Structure(
                "no trending entries found in page".to_string(),
            ));
        }

        debug!("Fetched {} trending candidate(s)", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
    <html><body>
      <article class="Box-row">
        <h2><a href="/tokio-rs/tokio"> tokio-rs / tokio </a></h2>
        <p> A runtime for writing reliable asynchronous applications </p>
        <span itemprop="programmingLanguage">Rust</span>
        <a href="/tokio-rs/tokio/stargazers"> 28,154 </a>
      </article>
      <article class="Box-row">
        <h2><a href="/denoland/deno"> denoland / deno </a></h2>
        <a href="/denoland/deno/stargazers">102,337</a>
      </article>
      <article class="Box-row">
        <div>row without a title anchor</div>
      </article>
    </body></html>
    "#;

    #[test]
    fn test_parse_page_extracts_candidates() {
        let feed = TrendingFeed::new(DEFAULT_TRENDING_URL).unwrap();
        let candidates = feed.parse_page(FIXTURE);

        assert_eq!(candidates.len(), 2);

        let tokio = &candidates[0];
        assert_eq!(tokio.id, "https://github.com/tokio-rs/tokio");
        assert_eq!(tokio.name, "tokio-rs/tokio");
        assert_eq!(
            tokio.description,
            "A runtime for writing reliable asynchronous applications"
        );
        assert_eq!(tokio.language, Some("Rust".to_string()));
        assert_eq!(tokio.stars, 28_154);
    }

    #[test]
    fn test_parse_page_defaults_missing_fields() {
        let feed = TrendingFeed::new(DEFAULT_TRENDING_URL).unwrap();
        let candidates = feed.parse_page(FIXTURE);

        let deno = &candidates[1];
        assert_eq!(deno.description, "");
        assert_eq!(deno.language, None);
        assert_eq!(deno.stars, 102_337);
    }

    #[test]
    fn test_parse_page_skips_malformed_rows() {
        let feed = TrendingFeed::new(DEFAULT_TRENDING_URL).unwrap();
        // The third row has no title anchor and must not appear
        assert_eq!(feed.parse_page(FIXTURE).len(), 2);
    }

    #[test]
    fn test_parse_empty_page() {
        let feed = TrendingFeed::new(DEFAULT_TRENDING_URL).unwrap();
        assert!(feed.parse_page("<html></html>").is_empty());
    }
}
