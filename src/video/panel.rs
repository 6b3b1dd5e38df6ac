use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, warn};

use super::{embed_url, SearchError, VideoResult, VideoSearch};

// What the player shows before anything is picked.
pub const DEFAULT_VIDEO: &str = "dQw4w9WgXcQ";

type Outcome = (u64, Result<Vec<VideoResult>, SearchError>);

pub struct SearchPanel {
    client: Arc<dyn VideoSearch>,
    query: String,
    loading: bool,
    error: Option<&'static str>,
    results: Vec<VideoResult>,
    selected: usize,
    current_video: String,
    // bumped per search; answers to older searches are dropped
    generation: u64,
    tx: Sender<Outcome>,
    rx: Receiver<Outcome>,
}

impl SearchPanel {
    pub fn new(client: Arc<dyn VideoSearch>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            client,
            query: String::new(),
            loading: false,
            error: None,
            results: Vec::new(),
            selected: 0,
            current_video: DEFAULT_VIDEO.to_string(),
            generation: 0,
            tx,
            rx,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn results(&self) -> &[VideoResult] {
        &self.results
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn current_video(&self) -> &str {
        &self.current_video
    }

    pub fn embed_url(&self) -> String {
        embed_url(&self.current_video)
    }

    // Kick off a search for the current query. Whitespace-only queries do
    // nothing at all. Returns whether a request was started.
    pub fn search(&mut self) -> bool {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            warn!("search attempted with empty query");
            return false;
        }
        self.generation += 1;
        self.loading = true;
        self.error = None;
        info!(%query, "search submitted");

        let generation = self.generation;
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("video-search".into())
            .spawn(move || {
                let _ = tx.send((generation, client.search(&query)));
            });
        if let Err(e) = spawned {
            error!(error = %e, "could not start search worker");
            self.loading = false;
            self.error = Some(super::GENERIC_MESSAGE);
            return false;
        }
        true
    }

    // Apply a finished search, if any. Returns whether the panel changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok((generation, outcome)) = self.rx.try_recv() {
            if generation != self.generation {
                continue;
            }
            self.apply(outcome);
            changed = true;
        }
        changed
    }

    fn apply(&mut self, outcome: Result<Vec<VideoResult>, SearchError>) {
        self.loading = false;
        match outcome {
            Ok(results) => {
                self.results = results;
                self.selected = 0;
            }
            Err(e) => {
                error!(error = %e, "search failed");
                self.error = Some(e.user_message());
            }
        }
    }

    pub fn select_next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1).min(self.results.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    // Make result `index` the current video. Nothing else changes.
    pub fn select(&mut self, index: usize) -> Option<&VideoResult> {
        let video = self.results.get(index)?;
        info!(video = %video.id, title = %video.title, "video selected");
        self.selected = index;
        self.current_video = video.id.clone();
        Some(video)
    }

    pub fn play_selected(&mut self) -> Option<&VideoResult> {
        self.select(self.selected)
    }
}

#[cfg(test)]
impl SearchPanel {
    // Block until the in-flight search lands.
    pub fn wait(&mut self) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while self.loading {
            assert!(std::time::Instant::now() < deadline, "search timed out");
            self.poll();
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    // Answers every query with canned results (or a canned failure) and
    // records what was asked.
    pub struct FakeSearch {
        queries: Mutex<Vec<String>>,
        fail: Option<fn() -> SearchError>,
    }

    impl FakeSearch {
        pub fn ok() -> Arc<Self> {
            Arc::new(Self { queries: Mutex::new(Vec::new()), fail: None })
        }

        pub fn failing(fail: fn() -> SearchError) -> Arc<Self> {
            Arc::new(Self { queries: Mutex::new(Vec::new()), fail: Some(fail) })
        }

        pub fn asked(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    pub fn video(id: &str) -> VideoResult {
        VideoResult {
            id: id.to_string(),
            title: format!("title {id}"),
            thumbnail: None,
            channel: "chan".into(),
            description: String::new(),
        }
    }

    impl VideoSearch for FakeSearch {
        fn search(&self, query: &str) -> Result<Vec<VideoResult>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            match self.fail {
                Some(fail) => Err(fail()),
                None => Ok(vec![video(&format!("{query}-1")), video(&format!("{query}-2"))]),
            }
        }
    }
}
