use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Secret;

use super::{SearchError, VideoResult, VideoSearch};

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
pub const DEFAULT_MAX_RESULTS: u8 = 6;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct YoutubeClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<Secret>,
    max_results: u8,
}

// key stays out of logs and panics
impl fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl YoutubeClient {
    pub fn new(endpoint: String, api_key: Option<Secret>, max_results: u8) -> Result<Self, SearchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Transport(e.without_url()))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            max_results,
        })
    }

    fn key(&self) -> Result<&str, SearchError> {
        self.api_key
            .as_ref()
            .map(|k| k.expose().trim())
            .filter(|k| !k.is_empty())
            .ok_or(SearchError::MissingApiKey)
    }
}

impl VideoSearch for YoutubeClient {
    fn search(&self, query: &str) -> Result<Vec<VideoResult>, SearchError> {
        let key = self.key()?;
        let url = build_url(&self.endpoint, query, self.max_results, key)?;
        info!(%query, "searching videos");

        // reqwest errors carry the url, and the url carries the key
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| SearchError::Transport(e.without_url()))?;
        let status = response.status();
        debug!(%status, "search response");
        if !status.is_success() {
            return Err(SearchError::Status(status));
        }
        let body = response.text().map_err(|e| SearchError::Transport(e.without_url()))?;
        let results = parse_response(&body)?;
        info!(%query, count = results.len(), "search finished");
        Ok(results)
    }
}

pub fn build_url(endpoint: &str, query: &str, max_results: u8, key: &str) -> Result<reqwest::Url, SearchError> {
    let max_results = max_results.to_string();
    reqwest::Url::parse_with_params(
        endpoint,
        [
            ("part", "snippet"),
            ("q", query),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("key", key),
        ],
    )
    .map_err(|e| SearchError::Endpoint(e.to_string()))
}

#[derive(Deserialize)]
struct RawResponse {
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: Option<RawId>,
    snippet: Option<RawSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
    title: Option<String>,
    channel_title: Option<String>,
    description: Option<String>,
    thumbnails: Option<RawThumbnails>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnails {
    medium: Option<RawThumbnail>,
    default: Option<RawThumbnail>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    url: Option<String>,
}

// no `items` array is malformed; items missing an id or title are skipped
pub fn parse_response(body: &str) -> Result<Vec<VideoResult>, SearchError> {
    let raw: RawResponse = serde_json::from_str(body).map_err(|e| SearchError::Malformed(e.to_string()))?;
    let items = raw
        .items
        .ok_or_else(|| SearchError::Malformed("response has no items array".into()))?;
    Ok(items.into_iter().filter_map(into_result).collect())
}

fn into_result(item: RawItem) -> Option<VideoResult> {
    let id = item.id.and_then(|id| id.video_id);
    let snippet = item.snippet;
    let title = snippet.as_ref().and_then(|s| s.title.clone());
    let (Some(id), Some(title)) = (id, title) else {
        warn!("skipping search result without id or title");
        return None;
    };
    let snippet = snippet?;
    let thumbnail = snippet.thumbnails.and_then(|t| {
        t.medium
            .and_then(|m| m.url)
            .or_else(|| t.default.and_then(|d| d.url))
    });
    Some(VideoResult {
        id,
        title,
        thumbnail,
        channel: snippet.channel_title.unwrap_or_default(),
        description: snippet.description.unwrap_or_default(),
    })
}
