//! tagwise: metadata suggestion CLI
//!
//! Runs single or batched suggestion lookups and maintains the cache.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use tagwise::{Config, EntryCache, LookupRequest, Operation, SuggestionEngine, SuggestionOutcome};

/// Tagwise metadata suggestion tool
#[derive(Parser)]
#[command(name = "tagwise")]
#[command(version = tagwise::PKG_VERSION)]
#[command(about = "Cached, adaptively batched tag suggestions for audio libraries")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "TAGWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Suggest a value for one track
    Suggest {
        /// Suggestion kind: genre, mood, style or language_code
        #[arg(short, long, default_value = "genre")]
        operation: Operation,
        /// Track title
        #[arg(short, long)]
        title: String,
        /// Track artist
        #[arg(short, long)]
        artist: String,
    },

    /// Suggest values for a JSON array of {"title", "artist"} objects
    Batch {
        /// Input file
        file: PathBuf,
        /// Suggestion kind: genre, mood, style or language_code
        #[arg(short, long, default_value = "genre")]
        operation: Operation,
    },

    /// Inspect or maintain the suggestion cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print the full version with git metadata
    Version,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Drop expired entries and rewrite the snapshot
    Purge,
    /// Remove every entry
    Clear,
    /// Show entry count and location
    Stats,
}

#[derive(Deserialize)]
struct BatchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialise tracing (default: info, debug with --verbose; override with RUST_LOG).
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Command::Version = args.command {
        println!("tagwise {}", tagwise::version_string());
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    config.validate()?;

    match args.command {
        Command::Suggest {
            operation,
            title,
            artist,
        } => {
            let engine = SuggestionEngine::from_config(&config).await?;
            let outcome = engine
                .suggest(&LookupRequest::new(operation, title, artist))
                .await;
            println!("{}", describe(&outcome));
            engine.cache().persist();
            engine.close().await;
        }

        Command::Batch { file, operation } => {
            let content = tokio::fs::read_to_string(&file).await?;
            let items: Vec<BatchItem> = serde_json::from_str(&content)?;
            let requests: Vec<LookupRequest> = items
                .into_iter()
                .map(|item| LookupRequest::new(operation, item.title, item.artist))
                .collect();

            let engine = SuggestionEngine::from_config(&config).await?;
            info!(
                version = tagwise::version_string(),
                provider = engine.provider_name(),
                model = engine.model(),
                requests = requests.len(),
                "starting batch run"
            );
            let report = engine.suggest_batch(&requests).await;

            for (request, outcome) in requests.iter().zip(&report.outcomes) {
                println!("{} - {}\t{}", request.artist, request.title, describe(outcome));
            }
            for (index, batch) in report.batches.iter().enumerate() {
                debug!(
                    batch = index,
                    size = batch.size,
                    errors = batch.errors,
                    elapsed_ms = batch.elapsed.as_millis() as u64,
                    next_size = batch.next_size,
                    "batch stats"
                );
            }
            engine.close().await;
        }

        Command::Cache { action } => {
            let (cache, loaded) = EntryCache::open_with_outcome(config.cache.to_cache_config()).await;
            match action {
                CacheAction::Purge => {
                    // Loading already drops expired and malformed entries.
                    let removed = loaded.removed + cache.purge_expired();
                    cache.persist();
                    println!("removed {removed} expired or malformed entries");
                }
                CacheAction::Clear => {
                    let count = cache.len();
                    cache.clear();
                    println!("cleared {count} entries");
                }
                CacheAction::Stats => {
                    println!("entries: {}", cache.len());
                    println!("expiry:  {}d", cache.expiry().as_secs() / 86_400);
                    match cache.path() {
                        Some(path) => println!("path:    {}", path.display()),
                        None => println!("path:    (in memory)"),
                    }
                }
            }
            cache.close().await;
        }

        Command::Version => {}
    }

    Ok(())
}

fn describe(outcome: &SuggestionOutcome) -> String {
    match outcome {
        SuggestionOutcome::Suggested(value) => value.clone(),
        SuggestionOutcome::Cached(value) => format!("{value} (cached)"),
        SuggestionOutcome::Unknown => "(unknown)".to_string(),
        SuggestionOutcome::Skipped => "(skipped: missing title or artist)".to_string(),
        SuggestionOutcome::Failed(e) => format!("(failed: {e})"),
    }
}
