//! repocast-agent - unattended publishing daemon
//!
//! Periodically picks one unpublished repository from the trending feed,
//! generates a short post, and publishes it through the configured target
//! with an optional screenshot and a follow-up reply carrying the repo link.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use librepocast::capture::browser::BrowserCapture;
use librepocast::config::{expand_path, Config};
use librepocast::feed::trending::TrendingFeed;
use librepocast::generator::ollama::OllamaGenerator;
use librepocast::logging::{self, LogFormat, LoggingConfig};
use librepocast::target::mastodon::MastodonTarget;
use librepocast::{ActivityLog, DedupStore, IterationOutcome, PublishPipeline, Result};

/// Cooldown after a cycle with nothing in the feed
const NO_CANDIDATES_COOLDOWN: Duration = Duration::from_secs(3600);
/// Cooldown after a cycle where everything was already published
const ALL_SEEN_COOLDOWN: Duration = Duration::from_secs(7200);
/// Cooldown after an abandoned candidate
const FAILURE_COOLDOWN: Duration = Duration::from_secs(1800);
/// Cooldown after an iteration-level error
const ERROR_COOLDOWN: Duration = Duration::from_secs(600);

#[derive(Parser, Debug)]
#[command(name = "repocast-agent")]
#[command(version)]
#[command(about = "Unattended publishing agent for trending repositories")]
#[command(long_about = "\
repocast-agent - unattended publishing agent

DESCRIPTION:
    repocast-agent is a long-running daemon. Each cycle it fetches the
    trending feed, picks one repository that has never been published,
    generates a post (local LLM with a deterministic fallback), captures a
    screenshot, and publishes through the configured target: media upload,
    primary post, then a reply carrying the repository link.

    Every confirmed publish is appended to the activity log, which also
    guarantees at-most-once publication across restarts.

USAGE:
    # Run in foreground (logs to stderr)
    repocast-agent

    # Run a single iteration and exit
    repocast-agent --once

    # Enable verbose logging
    repocast-agent --verbose

SIGNALS:
    SIGTERM, SIGINT - graceful shutdown between iterations

CONFIGURATION:
    Configuration file: ~/.config/repocast/config.toml
    Override with REPOCAST_CONFIG or --config.

    [agent]
    posts_per_hour = 4
    activity_log = \"~/.local/share/repocast/activity.jsonl\"

    [target]
    instance = \"mastodon.social\"
    token_file = \"~/.config/repocast/target.token\"

EXIT CODES:
    0 - clean shutdown
    1 - runtime error
    2 - fatal publish-target error at startup
    3 - invalid input
")]
struct Cli {
    /// Path to the config file (defaults to the XDG location)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run a single iteration and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        LoggingConfig::new(LogFormat::Text, "debug".to_string(), true).init();
    } else {
        logging::init_default();
    }

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    info!("repocast-agent starting");

    let mut pipeline = build_pipeline(&config)?;
    info!(
        "{} candidate(s) already published",
        pipeline.dedup().len()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let interval = Duration::from_secs(3600 / u64::from(config.agent.posts_per_hour.max(1)));
    info!("Publish interval: {:?}", interval);

    if cli.once {
        let outcome = pipeline.run_iteration().await?;
        info!("Single iteration finished: {}", describe(&outcome));
    } else {
        run_loop(&mut pipeline, interval, shutdown).await;
    }

    info!("repocast-agent stopped");
    Ok(())
}

fn build_pipeline(config: &Config) -> Result<PublishPipeline> {
    let log = ActivityLog::open(expand_path(&config.agent.activity_log))?;
    let dedup = DedupStore::load(&log)?;

    let feed = TrendingFeed::new(config.feed.trending_url.clone())?;
    let target = MastodonTarget::from_config(&config.target)?;

    let mut pipeline = PublishPipeline::new(Box::new(feed), Box::new(target), log, dedup)
        .with_retry(config.retry.policy())
        .with_media_policy(config.pipeline.media_failure_policy);

    match &config.generator {
        Some(generator) if generator.enabled => {
            pipeline = pipeline.with_generator(Box::new(OllamaGenerator::new(
                generator.host.clone(),
                generator.port,
                generator.model.clone(),
                config.target.post_char_limit,
            )));
        }
        _ => info!("Content generator disabled, using fallback template"),
    }

    match &config.capture {
        Some(capture) if capture.enabled => {
            pipeline = pipeline.with_capture(Box::new(BrowserCapture::new(
                capture.browser.clone(),
                expand_path(&capture.output_dir),
                capture.timeout_secs,
            )));
        }
        _ => info!("Media capture disabled, publishing text-only"),
    }

    Ok(pipeline)
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        librepocast::RepocastError::InvalidInput(format!("Signal setup failed: {}", e))
    })?;

    std::thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

/// Main daemon loop. One candidate per cycle; cooldown depends on how the
/// cycle ended. No outcome or error ever terminates the loop.
async fn run_loop(pipeline: &mut PublishPipeline, interval: Duration, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        let cooldown = match pipeline.run_iteration().await {
            Ok(IterationOutcome::Published(entry)) => {
                info!("Published {} as {}", entry.candidate_id, entry.post_id);
                interval
            }
            Ok(IterationOutcome::NoCandidates) => {
                info!(
                    "No candidates this cycle, retrying in {}s",
                    NO_CANDIDATES_COOLDOWN.as_secs()
                );
                NO_CANDIDATES_COOLDOWN
            }
            Ok(IterationOutcome::AllSeen) => {
                info!(
                    "All candidates already published, refreshing in {}s",
                    ALL_SEEN_COOLDOWN.as_secs()
                );
                ALL_SEEN_COOLDOWN
            }
            Ok(IterationOutcome::Abandoned {
                candidate_id,
                reason,
            }) => {
                warn!("Abandoned {}: {}", candidate_id, reason);
                FAILURE_COOLDOWN
            }
            Err(e) => {
                error!("Iteration failed: {}", e);
                ERROR_COOLDOWN
            }
        };

        wait_interruptible(cooldown, shutdown.as_ref()).await;
    }
}

fn describe(outcome: &IterationOutcome) -> String {
    match outcome {
        IterationOutcome::Published(entry) => format!("published {}", entry.post_id),
        IterationOutcome::NoCandidates => "no candidates".to_string(),
        IterationOutcome::AllSeen => "all candidates already published".to_string(),
        IterationOutcome::Abandoned { candidate_id, .. } => {
            format!("abandoned {}", candidate_id)
        }
    }
}

/// Sleep in one-second slices so a shutdown signal cuts the wait short.
async fn wait_interruptible(duration: Duration, shutdown: &AtomicBool) {
    let mut remaining = duration.as_secs();
    while remaining > 0 {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        sleep(Duration::from_secs(1)).await;
        remaining -= 1;
    }
}
