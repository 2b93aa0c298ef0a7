//! Clip data structure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Channel;

/// A short recorded segment of a live stream.
///
/// `content_id` is the dedup key: the store holds exactly one `Clip` per
/// content id. View count, rank, and the referenced channel snapshot are
/// refreshed in place as newer observations arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Content identifier; never changes after creation
    pub content_id: String,

    /// Clip title
    pub title: String,

    /// Upstream view count at the most recent observation
    pub view_count: u32,

    /// Computed recency/popularity rank; refreshed every ingest cycle
    pub rank: f64,

    /// Numeric category/game type id
    pub type_id: u32,

    /// Resolved category/game display name
    pub game_title: String,

    /// Playable HLS media URL
    pub clip_url: String,

    /// Shareable deep-link URL
    pub shareable_url: String,

    /// Clip length in seconds
    pub duration_secs: u32,

    /// When the clip was uploaded
    pub uploaded_at: DateTime<Utc>,

    /// When the upstream expires the clip; it is dropped from the index
    /// once this is in the past
    pub expires_at: DateTime<Utc>,

    /// Channel id parsed from a `HZ-<digits>` tag, 0 when absent
    pub hype_zone_channel_id: u32,

    /// Owning channel snapshot, shared with the channel's other clips
    pub channel: Arc<Channel>,
}

impl Clip {
    /// Fold a fresh observation of the same content id into this clip:
    /// take the new view count and point at the new channel snapshot.
    pub fn apply_observation(&mut self, fresh: &Clip) {
        self.view_count = fresh.view_count;
        self.channel = Arc::clone(&fresh.channel);
    }

    /// Whether the clip's expiration timestamp has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
