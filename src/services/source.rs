// src/services/source.rs

//! Upstream source client.
//!
//! Fetches paginated channel listings and per-channel clip lists, and
//! enriches raw clip data with a resolved category name, a shareable
//! deep-link URL, and the hype-zone channel id parsed from tags.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Channel, Clip, Config};
use crate::utils::http;

/// Channels per listing page.
const PAGE_SIZE: u32 = 100;

/// Hard cap on listing pages per crawl; the early-exit checks normally
/// stop pagination long before this.
const MAX_PAGES: u32 = 1000;

/// Raw channel entry from the listing endpoint.
#[derive(Debug, Deserialize)]
struct RawChannel {
    id: u32,
    #[serde(rename = "token")]
    name: String,
    #[serde(rename = "viewersCurrent", default)]
    viewers_current: u32,
    #[serde(default)]
    online: bool,
    #[serde(default)]
    partnered: bool,
    #[serde(rename = "userId", default)]
    user_id: u32,
    #[serde(rename = "languageId", default)]
    language: Option<String>,
}

/// Raw clip entry from the per-channel clip endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClip {
    title: String,
    #[serde(default)]
    type_id: u32,
    #[serde(default)]
    view_count: u32,
    content_id: String,
    shareable_id: String,
    #[serde(default)]
    duration_in_seconds: u32,
    upload_date: chrono::DateTime<chrono::Utc>,
    expiration_date: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    content_locators: Vec<ContentLocator>,
    #[serde(default)]
    tags: Vec<String>,
}

impl RawClip {
    /// The playable HLS locator, when the upstream provides one.
    fn hls_url(&self) -> Option<&str> {
        self.content_locators
            .iter()
            .find(|locator| locator.locator_type == "HlsStreaming")
            .map(|locator| locator.uri.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentLocator {
    locator_type: String,
    uri: String,
}

/// Category lookup response.
#[derive(Debug, Deserialize)]
struct CategoryInfo {
    name: String,
}

fn hype_zone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^HZ-(\d+)$").expect("valid regex"))
}

/// Parse the hype-zone channel id out of clip tags.
///
/// The first tag matching `HZ-<digits>` wins; tags with a non-numeric
/// suffix are ignored, leaving the default of 0.
pub fn hype_zone_channel_id(tags: &[String]) -> u32 {
    tags.iter()
        .find_map(|tag| hype_zone_re().captures(tag))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Client for the upstream live-streaming platform API.
pub struct SourceClient {
    client: reqwest::Client,
    config: Arc<Config>,
    // Lazily populated, never evicted. Concurrent duplicate lookups for
    // the same id are tolerated, not deduplicated.
    category_names: RwLock<HashMap<u32, String>>,
}

impl SourceClient {
    /// Create a new source client with the given configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_client(&config.api)?;
        Ok(Self {
            client,
            config,
            category_names: RwLock::new(HashMap::new()),
        })
    }

    /// Fetch all online channels with at least `min_viewers` current
    /// viewers, optionally restricted to one language.
    ///
    /// The upstream sorts the listing descending by (online, viewers),
    /// so pagination stops as soon as a page is empty, its first entry
    /// falls below the viewer floor, or its first entry is offline.
    pub async fn fetch_online_channels(
        &self,
        min_viewers: u32,
        language_filter: Option<&str>,
    ) -> Result<Vec<Channel>> {
        let api = &self.config.api;
        let mut raw = Vec::new();

        for page in 0..MAX_PAGES {
            let url = format!(
                "{}/channels?limit={}&page={}&order=online:desc,viewersCurrent:desc\
                 &fields=token,id,viewersCurrent,online,userId,languageId,partnered",
                api.base_url, PAGE_SIZE, page
            );
            let body = http::fetch_text(&self.client, &url, api).await?;
            let entries: Vec<RawChannel> = serde_json::from_str(&body)?;

            let Some(first) = entries.first() else {
                break;
            };
            let last_page = first.viewers_current < min_viewers || !first.online;
            raw.extend(entries);
            if last_page {
                break;
            }

            // Don't hammer the listing endpoint.
            tokio::time::sleep(Duration::from_millis(api.page_delay_ms)).await;
        }

        let mut channels = Vec::new();
        for entry in raw {
            if !entry.online {
                continue;
            }
            let language = match entry.language {
                Some(l) if !l.trim().is_empty() => l,
                _ => "unknown".to_string(),
            };
            if let Some(filter) = language_filter {
                if language != filter {
                    continue;
                }
            }
            channels.push(Channel {
                id: entry.id,
                user_id: entry.user_id,
                name: entry.name,
                viewers_current: entry.viewers_current,
                online: entry.online,
                partnered: entry.partnered,
                language,
                logo_url: format!("{}/users/{}/avatar", api.base_url, entry.user_id),
            });
        }
        Ok(channels)
    }

    /// Fetch and enrich the clips of a single channel, stamped with the
    /// given channel snapshot.
    ///
    /// Clips without a playable HLS locator are skipped.
    pub async fn fetch_clips(&self, channel: &Arc<Channel>) -> Result<Vec<Clip>> {
        let api = &self.config.api;
        let url = format!("{}/clips/channels/{}", api.base_url, channel.id);
        let body = http::fetch_text(&self.client, &url, api).await?;
        let entries: Vec<RawClip> = serde_json::from_str(&body)?;

        let mut clips = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(clip_url) = entry.hls_url().map(String::from) else {
                continue;
            };
            let game_title = self.category_name(entry.type_id).await;

            clips.push(Clip {
                content_id: entry.content_id,
                title: entry.title,
                view_count: entry.view_count,
                rank: 0.0,
                type_id: entry.type_id,
                game_title,
                clip_url,
                shareable_url: format!(
                    "{}/{}?clip={}",
                    api.share_base_url, channel.id, entry.shareable_id
                ),
                duration_secs: entry.duration_in_seconds,
                uploaded_at: entry.upload_date,
                expires_at: entry.expiration_date,
                hype_zone_channel_id: hype_zone_channel_id(&entry.tags),
                channel: Arc::clone(channel),
            });
        }
        Ok(clips)
    }

    /// Resolve a category display name, caching successful lookups for
    /// the process lifetime. Failed lookups log and return `"Unknown"`
    /// without caching.
    async fn category_name(&self, type_id: u32) -> String {
        if let Ok(cache) = self.category_names.read() {
            if let Some(name) = cache.get(&type_id) {
                return name.clone();
            }
        }

        match self.fetch_category_name(type_id).await {
            Ok(name) => {
                if let Ok(mut cache) = self.category_names.write() {
                    cache.insert(type_id, name.clone());
                }
                name
            }
            Err(e) => {
                log::error!("Failed to get category name for {}: {}", type_id, e);
                "Unknown".to_string()
            }
        }
    }

    async fn fetch_category_name(&self, type_id: u32) -> Result<String> {
        let api = &self.config.api;
        let url = format!("{}/types/{}", api.base_url, type_id);
        let body = http::fetch_text(&self.client, &url, api).await?;
        let info: CategoryInfo = serde_json::from_str(&body)?;
        Ok(info.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Arc<Config> {
        let mut config = Config::default();
        config.api.base_url = base_url.to_string();
        config.api.share_base_url = base_url.to_string();
        config.api.page_delay_ms = 0;
        config.api.backoff_base_ms = 1;
        Arc::new(config)
    }

    fn raw_channel(id: u32, viewers: u32, online: bool) -> serde_json::Value {
        json!({
            "id": id,
            "token": format!("channel-{id}"),
            "viewersCurrent": viewers,
            "online": online,
            "partnered": false,
            "userId": id * 10,
            "languageId": "en",
        })
    }

    /// Terminate pagination with an empty listing page. Without one, a
    /// catch-all `/channels` mock keeps returning online, above-floor
    /// entries and the fetch walks all the way to the page cap.
    async fn mount_empty_page(server: &MockServer, page: &str) {
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server)
            .await;
    }

    #[test]
    fn hype_zone_first_match_wins() {
        let tags = vec![
            "fun".to_string(),
            "HZ-123".to_string(),
            "HZ-456".to_string(),
        ];
        assert_eq!(hype_zone_channel_id(&tags), 123);
    }

    #[test]
    fn hype_zone_ignores_non_numeric_suffix() {
        assert_eq!(hype_zone_channel_id(&["HZ-abc".to_string()]), 0);
        assert_eq!(hype_zone_channel_id(&["HZ-12x".to_string()]), 0);
        assert_eq!(hype_zone_channel_id(&[]), 0);
    }

    #[tokio::test]
    async fn pagination_stops_below_viewer_floor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                raw_channel(1, 500, true),
                raw_channel(2, 200, true),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([raw_channel(3, 1, true)])),
            )
            .mount(&server)
            .await;
        // Page 2 must never be requested; it has no mock, so a broken
        // early exit would surface as a 404 upstream error here.

        let client = SourceClient::new(test_config(&server.uri())).expect("client");
        let channels = client.fetch_online_channels(5, None).await.expect("fetch");

        // The final short page is still included; it only stops pagination.
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].name, "channel-1");
    }

    #[tokio::test]
    async fn pagination_stops_at_offline_boundary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                raw_channel(1, 50, true),
                raw_channel(2, 0, false),
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([raw_channel(3, 0, false)])),
            )
            .mount(&server)
            .await;

        let client = SourceClient::new(test_config(&server.uri())).expect("client");
        let channels = client.fetch_online_channels(5, None).await.expect("fetch");

        // Offline entries are filtered out of the result.
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, 1);
    }

    #[tokio::test]
    async fn pagination_stops_on_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                raw_channel(1, 500, true),
                raw_channel(2, 200, true),
            ])))
            .mount(&server)
            .await;
        mount_empty_page(&server, "1").await;
        // Page 2 has no mock; requesting it would fail the fetch.

        let client = SourceClient::new(test_config(&server.uri())).expect("client");
        let channels = client.fetch_online_channels(5, None).await.expect("fetch");
        assert_eq!(channels.len(), 2);
    }

    #[tokio::test]
    async fn blank_language_becomes_unknown() {
        let server = MockServer::start().await;
        let mut entry = raw_channel(1, 10, true);
        entry["languageId"] = json!("");
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([entry])))
            .mount(&server)
            .await;
        mount_empty_page(&server, "1").await;

        let client = SourceClient::new(test_config(&server.uri())).expect("client");
        let channels = client.fetch_online_channels(5, None).await.expect("fetch");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].language, "unknown");
    }

    #[tokio::test]
    async fn language_filter_is_exact() {
        let server = MockServer::start().await;
        let mut german = raw_channel(2, 10, true);
        german["languageId"] = json!("de");
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("page", "0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([raw_channel(1, 10, true), german])),
            )
            .mount(&server)
            .await;
        mount_empty_page(&server, "1").await;

        let client = SourceClient::new(test_config(&server.uri())).expect("client");
        let channels = client
            .fetch_online_channels(5, Some("en"))
            .await
            .expect("fetch");
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].language, "en");
    }

    #[tokio::test]
    async fn clips_are_enriched_and_hls_less_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clips/channels/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "title": "great play",
                    "typeId": 77,
                    "viewCount": 42,
                    "contentId": "c-1",
                    "shareableId": "share-1",
                    "durationInSeconds": 30,
                    "uploadDate": "2026-01-01T00:00:00Z",
                    "expirationDate": "2026-01-08T00:00:00Z",
                    "contentLocators": [
                        {"locatorType": "Thumbnail", "uri": "https://x/thumb.jpg"},
                        {"locatorType": "HlsStreaming", "uri": "https://x/clip.m3u8"}
                    ],
                    "tags": ["HZ-55"]
                },
                {
                    "title": "no media",
                    "typeId": 77,
                    "viewCount": 7,
                    "contentId": "c-2",
                    "shareableId": "share-2",
                    "durationInSeconds": 30,
                    "uploadDate": "2026-01-01T00:00:00Z",
                    "expirationDate": "2026-01-08T00:00:00Z",
                    "contentLocators": [],
                    "tags": []
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/types/77"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 77, "name": "Fortress"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let client = SourceClient::new(Arc::clone(&config)).expect("client");
        let channel = Arc::new(Channel {
            id: 9,
            user_id: 90,
            name: "niner".to_string(),
            viewers_current: 10,
            online: true,
            partnered: false,
            language: "en".to_string(),
            logo_url: String::new(),
        });

        let clips = client.fetch_clips(&channel).await.expect("fetch");
        assert_eq!(clips.len(), 1);

        let clip = &clips[0];
        assert_eq!(clip.content_id, "c-1");
        assert_eq!(clip.game_title, "Fortress");
        assert_eq!(clip.clip_url, "https://x/clip.m3u8");
        assert_eq!(
            clip.shareable_url,
            format!("{}/9?clip=share-1", server.uri())
        );
        assert_eq!(clip.hype_zone_channel_id, 55);
        assert!(Arc::ptr_eq(&clip.channel, &channel));

        // Second fetch resolves the category from the cache; the type
        // endpoint mock expects exactly one hit.
        let again = client.fetch_clips(&channel).await.expect("fetch");
        assert_eq!(again[0].game_title, "Fortress");
    }
}
