//! repocast-history - query the publish activity log

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;

use librepocast::activity_log::ActivityLog;
use librepocast::config::{expand_path, Config};
use librepocast::types::LogEntry;

#[derive(Parser, Debug)]
#[command(name = "repocast-history")]
#[command(version, about = "Query the publish activity log")]
#[command(long_about = r#"Query the publish activity log with filtering and formatting options.

EXAMPLES:
    # Show the last 20 publishes (default)
    repocast-history

    # Show more
    repocast-history --limit 50

    # Look up a specific repository
    repocast-history --candidate https://github.com/tokio-rs/tokio

    # Search post content
    repocast-history --search "async"

    # JSON output for scripting
    repocast-history --format json | jq '.[] | .post_id'

    # JSONL output (one JSON object per line)
    repocast-history --format jsonl

OUTPUT FORMATS:
    text  - human-readable text with timestamps (default)
    json  - JSON array
    jsonl - JSON lines, one object per line

EXIT CODES:
    0 - success (including empty results)
    1 - error (log not found, malformed arguments, etc.)
"#)]
struct Args {
    /// Path to the activity log (defaults to the configured location)
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Path to the config file used to locate the activity log
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show only entries for this candidate id (canonical URL)
    #[arg(long, value_name = "URL")]
    candidate: Option<String>,

    /// Search post content (case-insensitive substring match)
    #[arg(short, long, value_name = "TERM")]
    search: Option<String>,

    /// Maximum number of entries to show, newest first
    #[arg(short, long, default_value = "20", value_name = "N")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = resolve_log_path(&args)?;
    let log = ActivityLog::open(&log_path)
        .with_context(|| format!("Failed to open activity log at {}", log_path.display()))?;
    let entries = log.replay().context("Failed to read activity log")?;

    let selected = filter_entries(entries, &args);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&selected)?),
        "jsonl" => {
            for entry in &selected {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
        _ => print_text(&selected),
    }

    Ok(())
}

fn resolve_log_path(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.log {
        return Ok(path.clone());
    }

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load().context(
            "No --log given and the config file could not be loaded; \
             pass --log or create ~/.config/repocast/config.toml",
        )?,
    };

    Ok(expand_path(&config.agent.activity_log))
}

/// Newest first, filters applied, truncated to the limit.
fn filter_entries(mut entries: Vec<LogEntry>, args: &Args) -> Vec<LogEntry> {
    entries.reverse();

    entries
        .into_iter()
        .filter(|entry| {
            args.candidate
                .as_ref()
                .is_none_or(|candidate| &entry.candidate_id == candidate)
        })
        .filter(|entry| {
            args.search.as_ref().is_none_or(|term| {
                entry
                    .content
                    .to_lowercase()
                    .contains(&term.to_lowercase())
            })
        })
        .take(args.limit)
        .collect()
}

fn print_text(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("No publishes found");
        return;
    }

    for entry in entries {
        let timestamp = Utc
            .timestamp_opt(entry.timestamp, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| entry.timestamp.to_string());

        println!("[{}] {}", timestamp, entry.candidate_id);
        println!("  post:  {}", entry.post_id);
        println!("  media: {}", entry.media_ref.as_deref().unwrap_or("none"));
        println!("  {}", entry.content.replace('\n', "\n  "));
        println!();
    }
}
