//! Channel data structure.

use serde::{Deserialize, Serialize};

/// A broadcaster channel observed from the upstream listing.
///
/// Channel values are immutable snapshots. Many clips share one snapshot
/// through an `Arc`; "updating" a channel means replacing the shared
/// snapshot with a fresh one, never mutating fields through an alias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Channel unique identifier
    pub id: u32,

    /// Owning user identifier (used for the logo URL)
    pub user_id: u32,

    /// Channel display name
    pub name: String,

    /// Current viewer count; zeroed while the channel is offline
    pub viewers_current: u32,

    /// Whether the channel was online in the most recent crawl cycle
    pub online: bool,

    /// Whether the broadcaster is partnered
    pub partnered: bool,

    /// Language code; `"unknown"` when the upstream omits it
    pub language: String,

    /// URL of the channel logo image
    pub logo_url: String,
}

impl Channel {
    /// Derive the snapshot used at the start of a crawl cycle: offline with
    /// zero viewers. A channel only comes back online by being re-observed
    /// in that cycle's fresh batch.
    pub fn offline_snapshot(&self) -> Channel {
        Channel {
            viewers_current: 0,
            online: false,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_snapshot_zeroes_live_fields() {
        let channel = Channel {
            id: 7,
            user_id: 70,
            name: "streamer".to_string(),
            viewers_current: 420,
            online: true,
            partnered: true,
            language: "en".to_string(),
            logo_url: "https://example.com/avatar".to_string(),
        };

        let offline = channel.offline_snapshot();
        assert!(!offline.online);
        assert_eq!(offline.viewers_current, 0);
        assert_eq!(offline.name, "streamer");
        assert!(offline.partnered);
    }
}
