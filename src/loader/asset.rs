use std::path::{Path, PathBuf};

use crate::audio::{DecodeError, SampleBuffer};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to decode {locator}: {source}")]
    Decode {
        locator: String,
        #[source]
        source: DecodeError,
    },
    #[error("loader worker for {0} could not be started")]
    Spawn(String),
}

// Fetch + decode for one sound source. Runs on a worker thread, so
// implementations must be shareable.
pub trait AssetLoader: Send + Sync + 'static {
    fn load(&self, locator: &str) -> Result<SampleBuffer, LoadError>;
}

// Loads sounds from the application's asset directory, converting them
// to the output device's sample rate.
pub struct FsAssetLoader {
    root: PathBuf,
    target_rate: u32,
}

impl FsAssetLoader {
    pub fn new(root: PathBuf, target_rate: u32) -> Self {
        Self { root, target_rate }
    }

    // Web-style locators ("/data/x.mp3") are relative to the asset root.
    pub fn resolve(&self, locator: &str) -> PathBuf {
        self.root.join(Path::new(locator.trim_start_matches('/')))
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&self, locator: &str) -> Result<SampleBuffer, LoadError> {
        let path = self.resolve(locator);
        if !path.is_file() {
            return Err(LoadError::NotFound(path.display().to_string()));
        }
        SampleBuffer::decode_file(&path, self.target_rate).map_err(|source| LoadError::Decode {
            locator: locator.to_string(),
            source,
        })
    }
}
