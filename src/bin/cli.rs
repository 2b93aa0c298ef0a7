//! clipmine CLI
//!
//! Local execution entry point: runs the crawler as a foreground
//! process, or inspects the durable snapshot without crawling.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clipmine::{
    crawler::Crawler,
    error::Result,
    models::Config,
    services::SourceClient,
    storage::{self, LocalStorage, SnapshotStorage},
    store::{ClipFilter, ClipStore, SortOrder},
    utils::{format_duration, parse_time},
};

/// clipmine - live-streaming clip harvester
#[derive(Parser, Debug)]
#[command(name = "clipmine", version, about = "Live-streaming clip harvester and index")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the crawl loop until interrupted
    Run {
        /// Disable the durable snapshot entirely
        #[arg(long)]
        no_snapshot: bool,

        /// Store snapshots in S3 instead of the local directory
        #[cfg(feature = "s3")]
        #[arg(long)]
        s3: bool,
    },

    /// Query the local snapshot without crawling
    Top {
        /// Sort order: views, rank, or recent
        #[arg(long, default_value = "views")]
        sort: SortOrder,

        /// Maximum number of clips to print
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Only clips uploaded at or after this time
        /// (RFC 3339, YYYY-MM-DD, relative like 2d, or epoch seconds)
        #[arg(long)]
        since: Option<String>,

        /// Only clips with at least this many views
        #[arg(long)]
        min_views: Option<u32>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn run(config: Arc<Config>, snapshot_storage: Option<Arc<dyn SnapshotStorage>>) -> Result<()> {
    let store = Arc::new(ClipStore::new(config.ranking.clone()));
    let source = Arc::new(SourceClient::new(Arc::clone(&config))?);

    let handle = Crawler::new(
        Arc::clone(&store),
        source,
        snapshot_storage,
        Arc::clone(&config),
    )
    .spawn();

    log::info!("Crawler running; press Ctrl-C to stop");
    let mut stats_tick = tokio::time::interval(std::time::Duration::from_secs(60));
    stats_tick.tick().await;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = stats_tick.tick() => {
                let (channels, online) = store.channel_counts();
                log::info!(
                    "{} clips, {} channels ({} online), last cycle {} | {}",
                    store.clip_count(),
                    channels,
                    online,
                    format_duration(store.last_update_duration()),
                    store.status()
                );
            }
        }
    }

    log::info!("Shutting down...");
    handle.stop().await;

    let (channels, online) = store.channel_counts();
    log::info!(
        "Final index: {} clips across {} channels ({} online)",
        store.clip_count(),
        channels,
        online
    );
    Ok(())
}

async fn top(
    config: Arc<Config>,
    sort: SortOrder,
    limit: usize,
    since: Option<String>,
    min_views: Option<u32>,
) -> Result<()> {
    let store = ClipStore::new(config.ranking.clone());
    let snapshot_storage = LocalStorage::new(&config.snapshot.local_dir);
    storage::restore(&store, &snapshot_storage, config.snapshot.version).await;

    if store.clip_count() == 0 {
        log::warn!("Snapshot is empty; run the crawler first");
        return Ok(());
    }

    let filter = ClipFilter {
        from_time: since.as_deref().map(parse_time).transpose()?,
        view_count_min: min_views,
        ..ClipFilter::default()
    };

    for clip in store.query(sort, limit, &filter) {
        println!(
            "{:>8} views  {:>10.2} rank  {}  [{}] {} ({})",
            clip.view_count,
            clip.rank,
            clip.uploaded_at.format("%Y-%m-%d %H:%M"),
            clip.channel.name,
            clip.title,
            format_duration(std::time::Duration::from_secs(u64::from(clip.duration_secs))),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Arc::new(Config::load_or_default(&cli.config));

    match cli.command {
        #[cfg(feature = "s3")]
        Command::Run { no_snapshot, s3 } => {
            config.validate()?;

            let snapshot_storage: Option<Arc<dyn SnapshotStorage>> = if no_snapshot {
                None
            } else if s3 {
                Some(Arc::new(storage::S3Storage::from_env().await?))
            } else {
                Some(Arc::new(LocalStorage::new(&config.snapshot.local_dir)))
            };

            run(config, snapshot_storage).await?;
        }

        #[cfg(not(feature = "s3"))]
        Command::Run { no_snapshot } => {
            config.validate()?;

            let snapshot_storage: Option<Arc<dyn SnapshotStorage>> = if no_snapshot {
                None
            } else {
                Some(Arc::new(LocalStorage::new(&config.snapshot.local_dir)))
            };

            run(config, snapshot_storage).await?;
        }

        Command::Top {
            sort,
            limit,
            since,
            min_views,
        } => {
            top(config, sort, limit, since, min_views).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}
