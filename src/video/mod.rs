// Video search: the HTTP client for the search endpoint and the panel
// state (query, results, current video) the dispatcher drives.
pub mod panel;
pub mod youtube;

pub use panel::SearchPanel;
pub use youtube::YoutubeClient;

pub const EMBED_BASE: &str = "https://www.youtube.com/embed/";

pub const CONFIG_MESSAGE: &str = "Missing API configuration. Please check setup.";
pub const GENERIC_MESSAGE: &str = "Oopsie! Something went wrong. Let's try again!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoResult {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub channel: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("invalid search endpoint: {0}")]
    Endpoint(String),
    #[error("search request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("search endpoint answered {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl SearchError {
    // The one line a child (or their grown-up) gets to see.
    pub fn user_message(&self) -> &'static str {
        match self {
            SearchError::MissingApiKey => CONFIG_MESSAGE,
            _ => GENERIC_MESSAGE,
        }
    }
}

// Blocking search call; the panel runs it on a worker thread.
pub trait VideoSearch: Send + Sync + 'static {
    fn search(&self, query: &str) -> Result<Vec<VideoResult>, SearchError>;
}

pub fn embed_url(video_id: &str) -> String {
    format!("{EMBED_BASE}{video_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_missing_key_gets_the_setup_message() {
        assert_eq!(SearchError::MissingApiKey.user_message(), CONFIG_MESSAGE);
        assert_eq!(
            SearchError::Status(reqwest::StatusCode::FORBIDDEN).user_message(),
            GENERIC_MESSAGE
        );
        assert_eq!(SearchError::Malformed("x".into()).user_message(), GENERIC_MESSAGE);
        assert_eq!(SearchError::Endpoint("x".into()).user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn embed_url_uses_the_video_id() {
        assert_eq!(embed_url("abc123"), "https://www.youtube.com/embed/abc123");
    }
}
