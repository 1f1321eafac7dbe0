//! YouTube lookups for video suggestions.
//!
//! With an API key the Data API v3 is used; without one the public results
//! page is scraped. Every failure degrades to an empty list.

use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use examly_core::config::YoutubeConfig;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const RESULTS_PAGE: &str = "https://www.youtube.com/results?search_query=";
const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static INITIAL_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var ytInitialData = (\{.+?\});").expect("initial data pattern"));
static VIDEO_ID_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""videoId":"([a-zA-Z0-9_-]{11})""#).expect("video id pattern"));
static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
        .expect("video url pattern")
});
static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("bare id pattern"));
static ISO_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern"));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub video_id: String,
    pub video_url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub channel_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl VideoResult {
    fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            video_url: watch_url(video_id),
            title: "YouTube Video".to_string(),
            description: String::new(),
            thumbnail: String::new(),
            channel_title: String::new(),
            duration: None,
        }
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Video id from a watch, short or embed URL, or a bare 11-character id.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(c) = VIDEO_URL.captures(url) {
        return Some(c[1].to_string());
    }
    BARE_ID.is_match(url).then(|| url.to_string())
}

/// `PT1H2M10S` → `1:02:10`, `PT4M5S` → `4:05`. Empty when unparseable.
pub fn format_duration(iso: &str) -> String {
    let Some(c) = ISO_DURATION.captures(iso) else {
        return String::new();
    };
    let part = |i: usize| c.get(i).and_then(|m| m.as_str().parse::<u64>().ok()).unwrap_or(0);
    let (h, m, s) = (part(1), part(2), part(3));
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn text_of(value: &Value) -> Option<String> {
    value
        .pointer("/runs/0/text")
        .or_else(|| value.get("simpleText"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Videos from the `ytInitialData` blob embedded in the results page.
pub fn parse_initial_data(data: &Value, max: usize) -> Vec<VideoResult> {
    let empty = Vec::new();
    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    sections
        .iter()
        .filter_map(|s| s.pointer("/itemSectionRenderer/contents").and_then(Value::as_array))
        .flatten()
        .filter_map(|item| item.get("videoRenderer"))
        .filter_map(|renderer| {
            let id = renderer.get("videoId").and_then(Value::as_str)?;
            let mut video = VideoResult::new(id);
            video.title = renderer
                .get("title")
                .and_then(text_of)
                .unwrap_or_else(|| "Untitled".to_string());
            video.description = renderer
                .pointer("/descriptionSnippet/runs")
                .and_then(Value::as_array)
                .map(|runs| runs.iter().filter_map(|r| r.get("text").and_then(Value::as_str)).collect())
                .unwrap_or_default();
            video.thumbnail = renderer
                .pointer("/thumbnail/thumbnails")
                .and_then(Value::as_array)
                .and_then(|t| t.last())
                .and_then(|t| t.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            video.channel_title = renderer.get("ownerText").and_then(text_of).unwrap_or_default();
            Some(video)
        })
        .take(max)
        .collect()
}

/// Distinct `"videoId":"…"` occurrences, in page order.
pub fn ids_from_html(html: &str, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    VIDEO_ID_FIELD
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|id| seen.insert(id.clone()))
        .take(max)
        .collect()
}

fn parse_api_items(data: &Value) -> Vec<VideoResult> {
    let empty = Vec::new();
    data.get("items")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
        .iter()
        .filter_map(|item| {
            let id = item.pointer("/id/videoId").and_then(Value::as_str)?;
            let snippet = item.get("snippet")?;
            let field = |key: &str| snippet.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
            let mut video = VideoResult::new(id);
            video.title = field("title");
            video.description = field("description");
            video.channel_title = field("channelTitle");
            video.thumbnail = snippet
                .pointer("/thumbnails/high/url")
                .or_else(|| snippet.pointer("/thumbnails/default/url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(video)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct VideoSearch {
    http: reqwest::Client,
    api_key: Option<String>,
    default_max: usize,
}

impl VideoSearch {
    pub fn from_config(config: &YoutubeConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            default_max: config.default_max_results as usize,
        }
    }

    pub fn default_max(&self) -> usize {
        self.default_max
    }

    /// Up to `max` videos for `query`. Never fails.
    pub async fn search(&self, query: &str, max: usize) -> Vec<VideoResult> {
        let query = query.trim();
        if query.is_empty() || max == 0 {
            return Vec::new();
        }
        let result = match &self.api_key {
            Some(key) => self.search_api(query, max, key).await,
            None => self.search_page(query, max).await,
        };
        match result {
            Ok(videos) => {
                debug!(query, found = videos.len(), "video search");
                videos
            }
            Err(e) => {
                warn!(query, error = %e, "video search failed");
                Vec::new()
            }
        }
    }

    async fn search_api(&self, query: &str, max: usize, key: &str) -> Result<Vec<VideoResult>, reqwest::Error> {
        let max_param = max.to_string();
        let data: Value = self
            .http
            .get(format!("{API_BASE}/search"))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_param.as_str()),
                ("order", "relevance"),
                ("videoEmbeddable", "true"),
                ("videoSyndicated", "true"),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut videos = parse_api_items(&data);
        if videos.is_empty() {
            return Ok(videos);
        }

        let ids = videos.iter().map(|v| v.video_id.as_str()).collect::<Vec<_>>().join(",");
        match self.durations(&ids, key).await {
            Ok(details) => {
                for video in &mut videos {
                    video.duration = details
                        .iter()
                        .find(|d| d.get("id").and_then(Value::as_str) == Some(video.video_id.as_str()))
                        .and_then(|d| d.pointer("/contentDetails/duration"))
                        .and_then(Value::as_str)
                        .map(format_duration)
                        .filter(|d| !d.is_empty());
                }
            }
            Err(e) => warn!(error = %e, "video details lookup failed"),
        }
        Ok(videos)
    }

    async fn durations(&self, ids: &str, key: &str) -> Result<Vec<Value>, reqwest::Error> {
        let data: Value = self
            .http
            .get(format!("{API_BASE}/videos"))
            .query(&[("part", "contentDetails"), ("id", ids), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(data.get("items").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    async fn search_page(&self, query: &str, max: usize) -> Result<Vec<VideoResult>, reqwest::Error> {
        let html = self
            .http
            .get(format!("{RESULTS_PAGE}{}", urlencoding::encode(query)))
            .header(reqwest::header::USER_AGENT, BROWSER_AGENT)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if let Some(c) = INITIAL_DATA.captures(&html) {
            match serde_json::from_str::<Value>(&c[1]) {
                Ok(data) => return Ok(parse_initial_data(&data, max)),
                Err(e) => warn!(error = %e, "ytInitialData did not parse"),
            }
        }
        Ok(ids_from_html(&html, max).iter().map(|id| VideoResult::new(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn video_ids_from_urls() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration("PT1H2M10S"), "1:02:10");
        assert_eq!(format_duration("PT4M5S"), "4:05");
        assert_eq!(format_duration("PT45S"), "0:45");
        assert_eq!(format_duration("garbage"), "");
    }

    #[test]
    fn initial_data_videos() {
        let data = json!({
            "contents": {"twoColumnSearchResultsRenderer": {"primaryContents": {"sectionListRenderer": {"contents": [
                {"itemSectionRenderer": {"contents": [
                    {"adSlotRenderer": {}},
                    {"videoRenderer": {
                        "videoId": "abcdefghijk",
                        "title": {"runs": [{"text": "Entropy explained"}]},
                        "descriptionSnippet": {"runs": [{"text": "Heat "}, {"text": "and order"}]},
                        "thumbnail": {"thumbnails": [{"url": "small.jpg"}, {"url": "large.jpg"}]},
                        "ownerText": {"runs": [{"text": "Physics Channel"}]}
                    }},
                    {"videoRenderer": {"videoId": "bbbbbbbbbbb", "title": {"simpleText": "Second"}}}
                ]}}
            ]}}}}
        });

        let videos = parse_initial_data(&data, 5);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].title, "Entropy explained");
        assert_eq!(videos[0].description, "Heat and order");
        assert_eq!(videos[0].thumbnail, "large.jpg");
        assert_eq!(videos[0].channel_title, "Physics Channel");
        assert_eq!(videos[0].video_url, "https://www.youtube.com/watch?v=abcdefghijk");
        assert_eq!(videos[1].title, "Second");

        assert_eq!(parse_initial_data(&data, 1).len(), 1);
        assert!(parse_initial_data(&json!({}), 5).is_empty());
    }

    #[test]
    fn raw_ids_are_deduplicated() {
        let html = r#"{"videoId":"aaaaaaaaaaa"},{"videoId":"aaaaaaaaaaa"},{"videoId":"bbbbbbbbbbb"},{"videoId":"short"}"#;
        assert_eq!(ids_from_html(html, 5), vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        assert_eq!(ids_from_html(html, 1), vec!["aaaaaaaaaaa"]);
    }

    #[test]
    fn api_items_prefer_high_thumbnail() {
        let data = json!({"items": [
            {"id": {"videoId": "ccccccccccc"}, "snippet": {
                "title": "Waves", "description": "d", "channelTitle": "c",
                "thumbnails": {"default": {"url": "d.jpg"}, "high": {"url": "h.jpg"}}
            }},
            {"id": {"kind": "youtube#channel"}, "snippet": {}}
        ]});
        let videos = parse_api_items(&data);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].thumbnail, "h.jpg");
        assert_eq!(videos[0].title, "Waves");
    }

    #[tokio::test]
    async fn blank_query_skips_network() {
        let search = VideoSearch::from_config(&YoutubeConfig { api_key: None, default_max_results: 5 });
        assert!(search.search("   ", 5).await.is_empty());
        assert!(search.search("entropy", 0).await.is_empty());
    }
}
