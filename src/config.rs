// Command line + environment configuration, and logging setup.
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::speech::SpeechSettings;
use crate::video::youtube::{DEFAULT_ENDPOINT, DEFAULT_MAX_RESULTS};

/// A soundboard for kids: drag sounds onto the board, loop them at any
/// tempo, and search for videos by typing or talking.
#[derive(Debug, Parser)]
#[command(name = "tinytunes", version, about)]
pub struct Args {
    /// Directory the sound sources are resolved against
    #[arg(default_value = ".")]
    pub assets: PathBuf,

    /// JSON file replacing the built-in sound catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Video search API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of videos per search (1-50)
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    pub max_results: u8,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub search_endpoint: String,

    /// Speech recognizer command; `{lang}` is replaced with the language
    #[arg(long)]
    pub speech_command: Option<String>,

    #[arg(long, default_value = "en-US")]
    pub speech_lang: String,

    /// Log file (the terminal belongs to the UI)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

// A credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--max-results must be between 1 and 50, got {0}")]
    MaxResults(u8),
    #[error("asset directory {0} does not exist")]
    MissingAssets(PathBuf),
    #[error("--speech-command is empty")]
    EmptySpeechCommand,
    #[error("invalid log level {0:?}")]
    LogLevel(String),
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logging already initialized")]
    LoggingInit,
}

#[derive(Debug)]
pub struct Settings {
    pub assets: PathBuf,
    pub catalog: Option<PathBuf>,
    pub api_key: Option<Secret>,
    pub max_results: u8,
    pub search_endpoint: String,
    pub speech: SpeechSettings,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !(1..=50).contains(&args.max_results) {
            return Err(ConfigError::MaxResults(args.max_results));
        }
        if !args.assets.is_dir() {
            return Err(ConfigError::MissingAssets(args.assets));
        }
        let command = match args.speech_command {
            Some(cmd) => {
                let parts: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
                if parts.is_empty() {
                    return Err(ConfigError::EmptySpeechCommand);
                }
                parts
            }
            None => Vec::new(),
        };
        // a blank key counts as no key
        let api_key = args
            .api_key
            .filter(|k| !k.trim().is_empty())
            .map(Secret::new);

        Ok(Self {
            assets: args.assets,
            catalog: args.catalog,
            api_key,
            max_results: args.max_results,
            search_endpoint: args.search_endpoint,
            speech: SpeechSettings {
                command,
                lang: args.speech_lang,
            },
            log_file: args
                .log_file
                .unwrap_or_else(|| std::env::temp_dir().join("tinytunes.log")),
            log_level: args.log_level,
        })
    }
}

// Route `tracing` output to the log file. RUST_LOG wins over the
// configured level.
pub fn init_logging(settings: &Settings) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .map_err(|_| ConfigError::LogLevel(settings.log_level.clone()))?,
    };
    let file = File::create(&settings.log_file).map_err(|source| ConfigError::LogFile {
        path: settings.log_file.clone(),
        source,
    })?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|_| ConfigError::LoggingInit)
}
