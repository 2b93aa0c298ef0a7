// src/store/mod.rs

//! The indexed clip store.
//!
//! Owns the authoritative content-id → clip map and three derived
//! projections (by view count, by rank, by recency). Each projection is
//! an immutable sequence rebuilt from scratch every ingest cycle and
//! swapped in as a whole unit, so concurrent readers always observe
//! either the previous or the new projection in full, never a partial
//! one.

pub mod query;
pub mod rank;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::models::{Channel, Clip, RankingConfig};

pub use query::{ClipFilter, SortOrder};

/// Outcome of one ingest cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestSummary {
    /// Clips observed for the first time
    pub added: usize,
    /// Clips updated in place
    pub updated: usize,
    /// Clips dropped for being past expiration
    pub expired: usize,
    /// Clips in the index after the cycle
    pub total: usize,
}

#[derive(Debug, Default)]
struct StoreStats {
    last_update_time: Option<DateTime<Utc>>,
    last_update_duration: Duration,
    last_snapshot_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StatusMessage {
    text: String,
    show_until: Option<Instant>,
}

type Projection = Arc<Vec<Arc<Clip>>>;

/// Concurrently-queryable index of harvested clips.
pub struct ClipStore {
    ranking: RankingConfig,
    clips: RwLock<HashMap<String, Clip>>,
    by_views: RwLock<Projection>,
    by_rank: RwLock<Projection>,
    by_recency: RwLock<Projection>,
    stats: Mutex<StoreStats>,
    status: Mutex<StatusMessage>,
}

// A poisoned lock only means another thread panicked mid-update; the
// data is still structurally valid, so recover the guard.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ClipStore {
    /// Create an empty store.
    pub fn new(ranking: RankingConfig) -> Self {
        Self {
            ranking,
            clips: RwLock::new(HashMap::new()),
            by_views: RwLock::new(Arc::new(Vec::new())),
            by_rank: RwLock::new(Arc::new(Vec::new())),
            by_recency: RwLock::new(Arc::new(Vec::new())),
            stats: Mutex::new(StoreStats::default()),
            status: Mutex::new(StatusMessage::default()),
        }
    }

    /// Merge a fresh clip batch into the index and republish the sorted
    /// projections.
    ///
    /// `fetch_duration` is how long the crawl that produced the batch
    /// took; it is folded into the reported cycle duration. `is_restore`
    /// marks a snapshot reload rather than a live crawl.
    pub fn ingest(&self, batch: Vec<Clip>, fetch_duration: Duration, is_restore: bool) -> IngestSummary {
        let ingest_start = Instant::now();
        let now = Utc::now();
        let mut summary = IngestSummary::default();

        // Merge phase, under exclusive access to the authoritative map.
        {
            let mut clips = write_lock(&self.clips);

            // 1. Every known channel goes offline with zero viewers; only
            // re-observation in this batch brings it back. This bounds the
            // staleness of liveness state to one cycle.
            let mut offline: HashMap<u32, Arc<Channel>> = HashMap::new();
            for clip in clips.values() {
                offline
                    .entry(clip.channel.id)
                    .or_insert_with(|| Arc::new(clip.channel.offline_snapshot()));
            }
            for clip in clips.values_mut() {
                if let Some(snapshot) = offline.get(&clip.channel.id) {
                    clip.channel = Arc::clone(snapshot);
                }
            }

            // 2. Drop expired clips.
            let before = clips.len();
            clips.retain(|_, clip| !clip.is_expired(now));
            summary.expired = before - clips.len();

            // 3. Merge the batch, remembering the freshest channel
            // snapshot seen for each channel id.
            let mut fresh_channels: HashMap<u32, Arc<Channel>> = HashMap::new();
            for incoming in batch {
                fresh_channels
                    .entry(incoming.channel.id)
                    .or_insert_with(|| Arc::clone(&incoming.channel));

                if let Some(existing) = clips.get_mut(&incoming.content_id) {
                    existing.apply_observation(&incoming);
                    summary.updated += 1;
                } else {
                    clips.insert(incoming.content_id.clone(), incoming);
                    summary.added += 1;
                }
            }

            // Re-observed channels update all of their clips, including
            // ones absent from this batch.
            for clip in clips.values_mut() {
                if let Some(snapshot) = fresh_channels.get(&clip.channel.id) {
                    clip.channel = Arc::clone(snapshot);
                }
            }

            // 4. Re-rank everything; rank decays with time, so clips not
            // in the batch change too.
            for clip in clips.values_mut() {
                clip.rank = rank::compute_rank(clip.view_count, clip.uploaded_at, now, &self.ranking);
            }

            summary.total = clips.len();
        }

        // Rebuild phase, under shared access: nothing mutates the map
        // here, so read-only accessors proceed concurrently.
        {
            let clips = read_lock(&self.clips);
            let shared: Vec<Arc<Clip>> = clips.values().cloned().map(Arc::new).collect();

            let by_views = insertion_sort_desc(&shared, |c| f64::from(c.view_count));
            let by_rank = insertion_sort_desc(&shared, |c| c.rank);
            let by_recency = insertion_sort_desc(&shared, |c| c.uploaded_at.timestamp_millis() as f64);

            // One whole-value swap per projection.
            *write_lock(&self.by_views) = Arc::new(by_views);
            *write_lock(&self.by_rank) = Arc::new(by_rank);
            *write_lock(&self.by_recency) = Arc::new(by_recency);
        }

        {
            let mut stats = mutex_lock(&self.stats);
            stats.last_update_time = Some(Utc::now());
            stats.last_update_duration = fetch_duration + ingest_start.elapsed();
        }

        log::info!(
            "Ingest{}: {} added, {} updated, {} expired, {} indexed",
            if is_restore { " (restore)" } else { "" },
            summary.added,
            summary.updated,
            summary.expired,
            summary.total
        );
        summary
    }

    /// Return up to `limit` clips from the requested projection, in its
    /// sort order, that pass every filter.
    ///
    /// Never errors: an empty or not-yet-published projection yields an
    /// empty vec. Returned clips are owned copies, not references into
    /// the store.
    pub fn query(&self, sort: SortOrder, limit: usize, filter: &ClipFilter) -> Vec<Clip> {
        let projection = Arc::clone(&read_lock(self.projection(sort)));

        let mut results = Vec::new();
        for clip in projection.iter() {
            if results.len() >= limit {
                break;
            }
            if filter.matches(clip) {
                results.push((**clip).clone());
            }
        }
        results
    }

    fn projection(&self, sort: SortOrder) -> &RwLock<Projection> {
        match sort {
            SortOrder::ViewCount => &self.by_views,
            SortOrder::Rank => &self.by_rank,
            SortOrder::MostRecent => &self.by_recency,
        }
    }

    /// Number of indexed clips. Returns 0 instead of blocking when the
    /// map is held exclusively.
    pub fn clip_count(&self) -> usize {
        self.clips.try_read().map(|clips| clips.len()).unwrap_or(0)
    }

    /// Distinct channels with clips, and how many of them are online.
    /// Returns (0, 0) instead of blocking.
    pub fn channel_counts(&self) -> (usize, usize) {
        let Ok(clips) = self.clips.try_read() else {
            return (0, 0);
        };
        let mut seen = HashSet::new();
        let mut online = 0;
        for clip in clips.values() {
            if seen.insert(clip.channel.id) && clip.channel.online {
                online += 1;
            }
        }
        (seen.len(), online)
    }

    /// Clips uploaded within the trailing window. Returns 0 instead of
    /// blocking.
    pub fn clips_created_since(&self, window: Duration) -> usize {
        let Ok(clips) = self.clips.try_read() else {
            return 0;
        };
        let cutoff = Utc::now() - window;
        clips.values().filter(|c| c.uploaded_at >= cutoff).count()
    }

    /// When the last ingest cycle completed.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.stats
            .try_lock()
            .map(|stats| stats.last_update_time)
            .unwrap_or(None)
    }

    /// Full cost of the last cycle: crawl fetch plus ingest.
    pub fn last_update_duration(&self) -> Duration {
        self.stats
            .try_lock()
            .map(|stats| stats.last_update_duration)
            .unwrap_or_default()
    }

    /// When the last durable snapshot was taken.
    pub fn last_snapshot_time(&self) -> Option<DateTime<Utc>> {
        self.stats
            .try_lock()
            .map(|stats| stats.last_snapshot_time)
            .unwrap_or(None)
    }

    /// Whether the durable-snapshot interval has elapsed (or no snapshot
    /// was ever taken).
    pub fn snapshot_due(&self, interval: Duration) -> bool {
        match self.last_snapshot_time() {
            Some(taken) => {
                Utc::now() - taken >= chrono::Duration::from_std(interval).unwrap_or_default()
            }
            None => true,
        }
    }

    /// Record that a durable snapshot was just taken.
    pub fn mark_snapshot_taken(&self) {
        mutex_lock(&self.stats).last_snapshot_time = Some(Utc::now());
    }

    /// Copy out every indexed clip, for the durable snapshot.
    pub fn all_clips(&self) -> Vec<Clip> {
        read_lock(&self.clips).values().cloned().collect()
    }

    /// Set the human-readable status line.
    ///
    /// Suppressed while a status set with [`set_status_for`] is still
    /// within its display duration.
    ///
    /// [`set_status_for`]: ClipStore::set_status_for
    pub fn set_status(&self, text: impl Into<String>) {
        let mut status = mutex_lock(&self.status);
        if let Some(until) = status.show_until {
            if Instant::now() < until {
                return;
            }
        }
        status.text = text.into();
        status.show_until = None;
    }

    /// Set a status line that holds the display for `duration`.
    pub fn set_status_for(&self, text: impl Into<String>, duration: Duration) {
        let mut status = mutex_lock(&self.status);
        status.text = text.into();
        status.show_until = Some(Instant::now() + duration);
    }

    /// Current status line. Returns an empty string instead of blocking.
    pub fn status(&self) -> String {
        self.status
            .try_lock()
            .map(|status| status.text.clone())
            .unwrap_or_default()
    }
}

/// Build a descending ordering by linear insertion.
///
/// A new entry is placed before the first existing entry with a strictly
/// smaller key, so among equal keys the first-inserted entry sorts
/// earlier.
fn insertion_sort_desc<F>(items: &[Arc<Clip>], key: F) -> Vec<Arc<Clip>>
where
    F: Fn(&Clip) -> f64,
{
    let mut sorted: Vec<Arc<Clip>> = Vec::with_capacity(items.len());
    for item in items {
        let item_key = key(item);
        match sorted.iter().position(|existing| item_key > key(existing)) {
            Some(index) => sorted.insert(index, Arc::clone(item)),
            None => sorted.push(Arc::clone(item)),
        }
    }
    sorted
}
