// src/store/query.rs

//! Query types for reading the clip index.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::Clip;

/// Which projection a query walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Raw upstream view count, descending (the default)
    #[default]
    ViewCount,
    /// Computed recency/popularity rank, descending
    Rank,
    /// Upload time, newest first
    MostRecent,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "views" | "viewcount" | "popularity" | "0" => Ok(SortOrder::ViewCount),
            "rank" | "1" => Ok(SortOrder::Rank),
            "recent" | "recency" | "2" => Ok(SortOrder::MostRecent),
            other => Err(AppError::validation(format!("unknown sort order `{other}`"))),
        }
    }
}

/// Optional, AND-combined clip filters.
///
/// Every field defaults to "don't care"; a clip must satisfy all set
/// fields to be returned.
#[derive(Debug, Clone, Default)]
pub struct ClipFilter {
    /// Only clips uploaded at or after this time
    pub from_time: Option<DateTime<Utc>>,
    /// Only clips uploaded at or before this time
    pub to_time: Option<DateTime<Utc>>,
    /// Inclusive lower bound on view count
    pub view_count_min: Option<u32>,
    /// Exact owning channel id
    pub channel_id: Option<u32>,
    /// Case-insensitive substring of the channel name
    pub channel_name: Option<String>,
    /// Channel online flag
    pub online: Option<bool>,
    /// Channel partnered flag
    pub partnered: Option<bool>,
    /// Case-insensitive substring of the category/game title
    pub game_title: Option<String>,
    /// Exact category/game type id
    pub game_id: Option<u32>,
    /// Exact hype-zone channel id
    pub hype_zone_channel_id: Option<u32>,
    /// Channel language, matched case-insensitively
    pub language: Option<String>,
}

impl ClipFilter {
    /// Whether a clip passes every set filter.
    pub fn matches(&self, clip: &Clip) -> bool {
        if let Some(from) = self.from_time {
            if clip.uploaded_at < from {
                return false;
            }
        }
        if let Some(to) = self.to_time {
            if clip.uploaded_at > to {
                return false;
            }
        }
        if let Some(min) = self.view_count_min {
            if clip.view_count < min {
                return false;
            }
        }
        if let Some(id) = self.channel_id {
            if clip.channel.id != id {
                return false;
            }
        }
        if let Some(name) = &self.channel_name {
            if !contains_ignore_case(&clip.channel.name, name) {
                return false;
            }
        }
        if let Some(online) = self.online {
            if clip.channel.online != online {
                return false;
            }
        }
        if let Some(partnered) = self.partnered {
            if clip.channel.partnered != partnered {
                return false;
            }
        }
        if let Some(title) = &self.game_title {
            if !contains_ignore_case(&clip.game_title, title) {
                return false;
            }
        }
        if let Some(id) = self.game_id {
            if clip.type_id != id {
                return false;
            }
        }
        if let Some(id) = self.hype_zone_channel_id {
            if clip.hype_zone_channel_id != id {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if !clip.channel.language.eq_ignore_ascii_case(language) {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
