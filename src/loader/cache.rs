// locator -> decoded buffer. loads run on worker threads and come back
// through poll(); only the dispatcher thread touches the cache

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::audio::{IdCounter, SampleBuffer, SampleId};

use super::asset::{AssetLoader, LoadError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Ready(SampleId),
    Pending,
}

#[derive(Debug)]
pub enum CacheEvent {
    Ready {
        locator: String,
        id: SampleId,
        buffer: Arc<SampleBuffer>,
    },
    Failed {
        locator: String,
        error: LoadError,
    },
}

// Outcome of a bulk warm-up, produced once every preloaded source has
// either loaded or failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreloadReport {
    pub loaded: usize,
    pub failed: usize,
    // (locator, reason) of the first source that failed, if any.
    pub first_failure: Option<(String, String)>,
}

#[derive(Debug, Default)]
struct PreloadProgress {
    waiting: HashSet<String>,
    report: PreloadReport,
}

struct CachedBuffer {
    id: SampleId,
    buffer: Arc<SampleBuffer>,
}

struct LoadOutcome {
    locator: String,
    result: Result<SampleBuffer, LoadError>,
}

pub struct BufferCache {
    loader: Arc<dyn AssetLoader>,
    entries: HashMap<String, CachedBuffer>,
    in_flight: HashSet<String>,
    ids: IdCounter,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    preload: Option<PreloadProgress>,
    finished_preload: Option<PreloadReport>,
}

impl BufferCache {
    pub fn new(loader: Arc<dyn AssetLoader>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            loader,
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            ids: IdCounter::default(),
            tx,
            rx,
            preload: None,
            finished_preload: None,
        }
    }

    // Idempotent: a cached locator is returned straight away, a locator
    // that is already loading is left alone, anything else starts a load.
    pub fn ensure(&mut self, locator: &str) -> Lookup {
        if let Some(entry) = self.entries.get(locator) {
            return Lookup::Ready(entry.id);
        }
        if !self.in_flight.contains(locator) {
            self.spawn_load(locator);
        }
        Lookup::Pending
    }

    pub fn get(&self, locator: &str) -> Option<(SampleId, &Arc<SampleBuffer>)> {
        self.entries.get(locator).map(|e| (e.id, &e.buffer))
    }

    pub fn is_loading(&self, locator: &str) -> bool {
        self.in_flight.contains(locator)
    }

    // Best-effort warm-up of every locator at once. One failure never
    // cancels the rest; the outcome is available from
    // take_preload_report once all are done.
    pub fn preload<'a>(&mut self, locators: impl IntoIterator<Item = &'a str>) {
        let mut progress = self.preload.take().unwrap_or_default();
        let mut seen = HashSet::new();
        for locator in locators {
            if !seen.insert(locator) {
                continue;
            }
            match self.ensure(locator) {
                Lookup::Ready(_) => progress.report.loaded += 1,
                Lookup::Pending => {
                    progress.waiting.insert(locator.to_string());
                }
            }
        }
        info!(waiting = progress.waiting.len(), "preloading sounds");
        self.settle_preload(progress);
    }

    pub fn take_preload_report(&mut self) -> Option<PreloadReport> {
        self.finished_preload.take()
    }

    // Drain finished loads. Successes are cached and returned so the
    // caller can register them with the engine; failures are not cached,
    // so the next `ensure` for that locator fetches again.
    pub fn poll(&mut self) -> Vec<CacheEvent> {
        let outcomes: Vec<LoadOutcome> = self.rx.try_iter().collect();
        outcomes.into_iter().map(|o| self.complete(o)).collect()
    }

    fn complete(&mut self, outcome: LoadOutcome) -> CacheEvent {
        let LoadOutcome { locator, result } = outcome;
        self.in_flight.remove(&locator);

        let event = match result {
            Ok(buffer) => {
                let id = SampleId(self.ids.next());
                let buffer = Arc::new(buffer);
                debug!(%locator, ?id, frames = buffer.len(), rate = buffer.sample_rate, "sound decoded");
                self.entries.insert(
                    locator.clone(),
                    CachedBuffer { id, buffer: Arc::clone(&buffer) },
                );
                CacheEvent::Ready { locator, id, buffer }
            }
            Err(error) => {
                warn!(%locator, %error, "failed to load sound");
                CacheEvent::Failed { locator, error }
            }
        };

        if let Some(mut progress) = self.preload.take() {
            let locator = match &event {
                CacheEvent::Ready { locator, .. } | CacheEvent::Failed { locator, .. } => locator,
            };
            if progress.waiting.remove(locator) {
                match &event {
                    CacheEvent::Ready { .. } => progress.report.loaded += 1,
                    CacheEvent::Failed { locator, error } => {
                        progress.report.failed += 1;
                        if progress.report.first_failure.is_none() {
                            progress.report.first_failure = Some((locator.clone(), error.to_string()));
                        }
                    }
                }
            }
            self.settle_preload(progress);
        }
        event
    }

    fn settle_preload(&mut self, progress: PreloadProgress) {
        if progress.waiting.is_empty() {
            let report = progress.report;
            info!(loaded = report.loaded, failed = report.failed, "preload finished");
            self.finished_preload = Some(report);
        } else {
            self.preload = Some(progress);
        }
    }

    fn spawn_load(&mut self, locator: &str) {
        self.in_flight.insert(locator.to_string());
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let owned = locator.to_string();
        debug!(%locator, "loading sound");

        let spawned = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let result = loader.load(&owned);
                let _ = tx.send(LoadOutcome { locator: owned, result });
            });
        if let Err(e) = spawned {
            warn!(%locator, error = %e, "could not start loader thread");
            let _ = self.tx.send(LoadOutcome {
                locator: locator.to_string(),
                result: Err(LoadError::Spawn(locator.to_string())),
            });
        }
    }
}

#[cfg(test)]
impl BufferCache {
    // Block until every in-flight load has reported back.
    pub fn wait_idle(&mut self) -> Vec<CacheEvent> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let mut events = Vec::new();
        while !self.in_flight.is_empty() {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            let outcome = self.rx.recv_timeout(left).expect("loader timed out");
            events.push(self.complete(outcome));
        }
        events
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeLoader;
    use super::*;

    #[test]
    fn ensure_loads_once_and_memoizes() {
        let loader = FakeLoader::with(&[("a.wav", 10)]);
        let mut cache = BufferCache::new(loader.clone());

        assert_eq!(cache.ensure("a.wav"), Lookup::Pending);
        assert_eq!(cache.ensure("a.wav"), Lookup::Pending);
        assert!(cache.is_loading("a.wav"));

        let events = cache.wait_idle();
        assert_eq!(events.len(), 1);
        let id = match &events[0] {
            CacheEvent::Ready { id, buffer, .. } => {
                assert_eq!(buffer.len(), 10);
                *id
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(cache.ensure("a.wav"), Lookup::Ready(id));
        assert_eq!(loader.calls("a.wav"), 1);
    }

    #[test]
    fn partial_preload_keeps_successes_and_retries_failures() {
        let loader = FakeLoader::with(&[("b.wav", 4)]);
        let mut cache = BufferCache::new(loader.clone());

        cache.preload(["a.wav", "b.wav"]);
        assert_eq!(cache.take_preload_report(), None);
        cache.wait_idle();

        let report = cache.take_preload_report().expect("preload finished");
        assert_eq!(report.loaded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.first_failure.as_ref().map(|f| f.0.as_str()), Some("a.wav"));

        assert!(cache.get("b.wav").is_some());
        assert!(cache.get("a.wav").is_none());

        // on-demand use of the failed sound fetches again
        loader.add("a.wav", 2);
        assert_eq!(cache.ensure("a.wav"), Lookup::Pending);
        cache.wait_idle();
        assert_eq!(loader.calls("a.wav"), 2);
        assert!(cache.get("a.wav").is_some());
    }

    #[test]
    fn preload_of_cached_sounds_reports_immediately() {
        let loader = FakeLoader::with(&[("a.wav", 1)]);
        let mut cache = BufferCache::new(loader.clone());
        cache.ensure("a.wav");
        cache.wait_idle();

        cache.preload(["a.wav"]);
        let report = cache.take_preload_report().unwrap();
        assert_eq!(report, PreloadReport { loaded: 1, failed: 0, first_failure: None });
        assert_eq!(loader.calls("a.wav"), 1);
    }

    #[test]
    fn preload_dedupes_repeated_locators() {
        let loader = FakeLoader::with(&[("snare.mp3", 3)]);
        let mut cache = BufferCache::new(loader.clone());
        cache.preload(["snare.mp3", "snare.mp3", "snare.mp3"]);
        cache.wait_idle();
        let report = cache.take_preload_report().unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(loader.calls("snare.mp3"), 1);
    }

    #[test]
    fn distinct_locators_get_distinct_ids() {
        let loader = FakeLoader::with(&[("a.wav", 1), ("b.wav", 1)]);
        let mut cache = BufferCache::new(loader);
        cache.ensure("a.wav");
        cache.ensure("b.wav");
        cache.wait_idle();
        let (a, _) = cache.get("a.wav").unwrap();
        let (b, _) = cache.get("b.wav").unwrap();
        assert_ne!(a, b);
    }
}
