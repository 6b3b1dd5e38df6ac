mod audio;
mod audio_api;
mod catalog;
mod config;
mod loader;
mod middle;
mod pipeline;
mod shared;
mod speech;
mod tempo;
mod tui;
mod video;

use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info};

use audio::AudioHandle;
use config::{Args, Settings};
use loader::asset::FsAssetLoader;
use loader::cache::BufferCache;
use middle::Middle;
use pipeline::playback::Playback;
use shared::InputEvent;
use speech::VoiceInput;
use video::{SearchPanel, YoutubeClient};

const TICK_RATE: Duration = Duration::from_millis(16); // ~60fps

fn main() {
    if let Err(e) = run() {
        error!(error = %format!("{e:#}"), "fatal");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let settings = Settings::from_args(Args::parse())?;
    config::init_logging(&settings)?;
    info!(version = env!("CARGO_PKG_VERSION"), assets = %settings.assets.display(), "tinytunes starting");

    let sounds = catalog::load(settings.catalog.as_deref()).context("failed to load the sound catalog")?;
    let audio = audio::start_audio()?;

    let loader = FsAssetLoader::new(settings.assets.clone(), audio.sample_rate());
    let playback = Playback::new(BufferCache::new(Arc::new(loader)), audio.sample_rate());
    let client = YoutubeClient::new(
        settings.search_endpoint.clone(),
        settings.api_key.clone(),
        settings.max_results,
    )
    .context("failed to set up video search")?;
    let voice = VoiceInput::new(speech::detect(&settings.speech));

    let mut middle = Middle::new(sounds, playback, SearchPanel::new(Arc::new(client)), voice);
    middle.preload_catalog();

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let result = event_loop(&mut term, &mut middle, &audio);

    // stop every loop and silence the engine before the stream goes away
    audio.send_all(middle.shutdown());
    drop(term);
    drop(audio);
    info!("tinytunes stopped");
    result
}

fn event_loop(
    term: &mut Terminal<CrosstermBackend<Stdout>>,
    middle: &mut Middle,
    audio: &AudioHandle,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state();
        tui_state.sync_panels(ds.board_open, ds.video_open);

        term.draw(|frame| {
            let area = frame.area();
            tui::view::render(frame, area, &ds, &mut tui_state, blink_on);
        })?;

        let events = tui::input::poll_input(TICK_RATE, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                return Ok(());
            }
            audio.send_all(middle.handle_input(event, start.elapsed()));
        }

        audio.send_all(middle.tick(start.elapsed()));
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}
