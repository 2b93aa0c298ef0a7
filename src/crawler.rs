// src/crawler.rs

//! Background crawl loop.
//!
//! One long-lived task cycles through fetch → ingest → cooldown for the
//! process lifetime. Errors never terminate the loop; a failed cycle is
//! logged, surfaced through the store's status line, and retried after
//! the normal cooldown. The task carries an explicit stop signal so it
//! can be shut down deterministically.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::Config;
use crate::services::SourceClient;
use crate::storage::{self, SnapshotStorage};
use crate::store::ClipStore;
use crate::utils::format_duration;

/// The background clip crawler.
pub struct Crawler {
    store: Arc<ClipStore>,
    source: Arc<SourceClient>,
    snapshot_storage: Option<Arc<dyn SnapshotStorage>>,
    config: Arc<Config>,
}

/// Handle to a running crawler task.
pub struct CrawlerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CrawlerHandle {
    /// Signal the crawler to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

impl Crawler {
    /// Create a new crawler.
    pub fn new(
        store: Arc<ClipStore>,
        source: Arc<SourceClient>,
        snapshot_storage: Option<Arc<dyn SnapshotStorage>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            source,
            snapshot_storage,
            config,
        }
    }

    /// Spawn the crawl loop as a background task.
    pub fn spawn(self) -> CrawlerHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        CrawlerHandle { stop: tx, task }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        // Warm-start from the durable snapshot before the first cycle.
        if let Some(snapshot_storage) = &self.snapshot_storage {
            storage::restore(
                &self.store,
                snapshot_storage.as_ref(),
                self.config.snapshot.version,
            )
            .await;
        }

        let cooldown = Duration::from_secs(self.config.crawler.cycle_secs);
        loop {
            if let Err(e) = self.run_cycle(&stop).await {
                log::error!("Update cycle failed: {}", e);
                self.store
                    .set_status_for(format!("Last update failed: {}", e), cooldown);
            }

            if *stop.borrow() || self.cooldown(&mut stop, cooldown).await {
                break;
            }
        }
        log::info!("Crawler stopped");
    }

    /// One full crawl cycle: fetch all clips, then ingest them.
    async fn run_cycle(&self, stop: &watch::Receiver<bool>) -> Result<()> {
        let crawl = &self.config.crawler;
        let fetch_start = Instant::now();

        self.store.set_status("Finding online channels...");
        let channels = self
            .source
            .fetch_online_channels(crawl.min_viewers, crawl.language.as_deref())
            .await?;
        log::info!(
            "Found {} online channels in {}",
            channels.len(),
            format_duration(fetch_start.elapsed())
        );

        let mut batch = Vec::new();
        for (count, channel) in channels.into_iter().enumerate() {
            if *stop.borrow() {
                break;
            }

            let channel = Arc::new(channel);
            match self.source.fetch_clips(&channel).await {
                Ok(clips) => batch.extend(clips),
                // One bad channel must never abort the whole cycle.
                Err(e) => {
                    log::error!("Failed to get clips for channel {}: {}", channel.name, e);
                }
            }

            if (count + 1) % crawl.progress_interval == 0 {
                let progress = format!("Crawled {} channels...", count + 1);
                log::info!("{}", progress);
                self.store.set_status(progress);
            }
        }

        let fetch_duration = fetch_start.elapsed();
        log::info!(
            "Found {} clips in {}",
            batch.len(),
            format_duration(fetch_duration)
        );

        self.store.set_status("Indexing new clips...");
        self.store.ingest(batch, fetch_duration, false);

        if let Some(snapshot_storage) = &self.snapshot_storage {
            let interval = Duration::from_secs(self.config.snapshot.interval_secs);
            if self.store.snapshot_due(interval) {
                // Best-effort; a failed backup never fails the cycle.
                if let Err(e) = storage::backup(
                    &self.store,
                    snapshot_storage.as_ref(),
                    self.config.snapshot.version,
                )
                .await
                {
                    log::error!("Snapshot backup failed: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Sleep out the inter-cycle interval, refreshing the countdown
    /// status once a second. Returns true when stop was signalled.
    async fn cooldown(&self, stop: &mut watch::Receiver<bool>, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            // Suppressed automatically while an error status is showing.
            self.store
                .set_status(format!("Next update in {}", format_duration(remaining)));

            let step = remaining.min(Duration::from_secs(1));
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return true;
                    }
                }
                _ = tokio::time::sleep(step) => {}
            }
        }
    }
}
