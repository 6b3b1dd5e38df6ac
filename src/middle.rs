// The dispatcher. Every input event and every finished background job
// (sound loads, searches, voice transcripts) is handled here, on one
// thread, and turned into audio commands for the engine plus the
// DisplayState the TUI draws.
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio_api::AudioCommand;
use crate::catalog::SoundDef;
use crate::pipeline::playback::{PlayOptions, Playback};
use crate::pipeline::tracks::{TrackId, TrackList};
use crate::shared::{CatalogButton, DisplayState, InputEvent, ResultView, SearchView, TrackView};
use crate::speech::{VoiceEvent, VoiceInput};
use crate::tempo::Tempo;
use crate::video::SearchPanel;

pub struct Middle {
    catalog: Vec<SoundDef>,
    tracks: TrackList,
    playback: Playback,
    search: SearchPanel,
    voice: VoiceInput,
    selected: Option<TrackId>,
    status: Option<String>,
    board_open: bool,
    video_open: bool,
}

impl Middle {
    pub fn new(catalog: Vec<SoundDef>, playback: Playback, search: SearchPanel, voice: VoiceInput) -> Self {
        Self {
            catalog,
            tracks: TrackList::new(),
            playback,
            search,
            voice,
            selected: None,
            status: None,
            board_open: true,
            video_open: true,
        }
    }

    // Warm the cache with every catalog sound. Progress arrives through
    // `tick`.
    pub fn preload_catalog(&mut self) {
        self.playback.preload(self.catalog.iter().map(|s| s.source.as_str()));
        self.status = Some("Loading sounds...".into());
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Duration) -> Vec<AudioCommand> {
        debug!(?event, "input");
        match event {
            InputEvent::DropSound(index) => self.drop_sound(index),
            InputEvent::PreviewSound(index) => {
                if let Some(sound) = self.catalog.get(index) {
                    self.playback.fire(&sound.source, PlayOptions::at_rate(sound.default_tempo.multiplier()));
                }
            }

            InputEvent::SelectTrack(index) => {
                if let Some(id) = self.tracks.id_at(index) {
                    self.selected = Some(id);
                }
            }
            InputEvent::SelectNextTrack => self.move_selection(1),
            InputEvent::SelectPrevTrack => self.move_selection(-1),
            InputEvent::ToggleTrack => {
                if let Some(id) = self.selected {
                    self.tracks.toggle(id, now, &mut self.playback);
                }
            }
            InputEvent::TempoUp => self.adjust_tempo(1),
            InputEvent::TempoDown => self.adjust_tempo(-1),
            InputEvent::VolumeUp => self.adjust_volume(1),
            InputEvent::VolumeDown => self.adjust_volume(-1),
            InputEvent::PreviewTrack => {
                if let Some(id) = self.selected {
                    self.tracks.preview(id, &mut self.playback);
                }
            }
            InputEvent::RemoveTrack => self.remove_selected(),
            InputEvent::StopAll => {
                self.tracks.stop_all(&mut self.playback);
                info!("all loops stopped");
            }
            InputEvent::SyncTempo => {
                // no selection resets everything to normal speed
                let tempo = self
                    .selected
                    .and_then(|id| self.tracks.get(id))
                    .map_or(Tempo::NORMAL, |t| t.tempo());
                self.tracks.set_all_tempo(tempo, &mut self.playback);
            }

            InputEvent::QueryChar(c) => self.search.push_char(c),
            InputEvent::QueryBackspace => self.search.pop_char(),
            InputEvent::SubmitSearch => {
                self.search.search();
            }
            InputEvent::VoiceSearch => {
                if let Err(e) = self.voice.activate() {
                    warn!(error = %e, "voice search unavailable");
                    self.status = Some(e.user_message().to_string());
                }
            }
            InputEvent::NextResult => self.search.select_next(),
            InputEvent::PrevResult => self.search.select_prev(),
            InputEvent::PlayResult => {
                self.search.play_selected();
            }
            InputEvent::SelectResult(index) => {
                self.search.select(index);
            }

            InputEvent::ToggleBoard => self.board_open = !self.board_open,
            InputEvent::ToggleVideo => self.video_open = !self.video_open,

            // the main loop owns quitting
            InputEvent::Quit => {}
        }
        self.playback.take_commands()
    }

    // Called every frame: pick up finished background work and let the
    // loops fire.
    pub fn tick(&mut self, now: Duration) -> Vec<AudioCommand> {
        self.playback.poll();
        if let Some(report) = self.playback.take_preload_report() {
            self.status = match report.first_failure {
                Some((locator, reason)) => {
                    warn!(%locator, %reason, failed = report.failed, "some sounds failed to preload");
                    Some(format!("{} sound(s) could not be loaded", report.failed))
                }
                None => None,
            };
        }
        self.search.poll();
        if let Some(event) = self.voice.poll() {
            match event {
                VoiceEvent::Transcript(text) => {
                    self.status = None;
                    self.search.set_query(text);
                    self.search.search();
                }
                VoiceEvent::Failed(message) => self.status = Some(message.to_string()),
            }
        }
        let stalled = self.tracks.tick(now, &mut self.playback);
        if let Some(track) = stalled.first().and_then(|&id| self.tracks.get(id)) {
            self.status = Some(format!("Couldn't play {}", track.sound.label));
        }
        self.playback.take_commands()
    }

    // Stop every loop and silence the engine. The caller sends the
    // returned commands before closing the output stream.
    pub fn shutdown(&mut self) -> Vec<AudioCommand> {
        info!(tracks = self.tracks.len(), looping = self.tracks.active_count(), "shutting down");
        self.tracks.stop_all(&mut self.playback);
        self.playback.close();
        self.playback.take_commands()
    }

    fn drop_sound(&mut self, index: usize) {
        let Some(sound) = self.catalog.get(index) else {
            return;
        };
        let id = self.tracks.add(sound);
        self.selected = Some(id);
    }

    fn move_selection(&mut self, delta: isize) {
        if self.tracks.is_empty() {
            return;
        }
        let last = self.tracks.len() - 1;
        let index = match self.selected.and_then(|id| self.tracks.position(id)) {
            Some(i) => i.saturating_add_signed(delta).min(last),
            None => 0,
        };
        self.selected = self.tracks.id_at(index);
    }

    fn adjust_tempo(&mut self, steps: i32) {
        if let Some(id) = self.selected {
            self.tracks.adjust_tempo(id, steps, &mut self.playback);
        }
    }

    fn adjust_volume(&mut self, steps: i32) {
        if let Some(id) = self.selected {
            self.tracks.adjust_volume(id, steps, &mut self.playback);
        }
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        let Some(index) = self.tracks.position(id) else {
            return;
        };
        self.tracks.remove(id, &mut self.playback);
        // keep the cursor in place, or on the new last row
        self.selected = self
            .tracks
            .id_at(index)
            .or_else(|| index.checked_sub(1).and_then(|i| self.tracks.id_at(i)));
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            status: self.status.clone(),
            catalog: self
                .catalog
                .iter()
                .map(|s| CatalogButton {
                    label: s.label.clone(),
                    color: s.rgb(),
                    category: s.category.clone(),
                    loaded: self.playback.is_cached(&s.source),
                    loading: self.playback.is_loading(&s.source),
                })
                .collect(),
            tracks: self
                .tracks
                .iter()
                .map(|t| TrackView {
                    label: t.sound.label.clone(),
                    color: t.sound.rgb(),
                    active: t.is_active(),
                    tempo: t.tempo(),
                    volume: t.volume,
                })
                .collect(),
            selected_track: self.selected.and_then(|id| self.tracks.position(id)),
            board_open: self.board_open,
            video_open: self.video_open,
            search: SearchView {
                query: self.search.query().to_string(),
                loading: self.search.is_loading(),
                error: self.search.error(),
                results: self
                    .search
                    .results()
                    .iter()
                    .map(|v| ResultView {
                        title: v.title.clone(),
                        channel: v.channel.clone(),
                    })
                    .collect(),
                selected: self.search.selected(),
                current_video: self.search.current_video().to_string(),
                embed_url: self.search.embed_url(),
                listening: self.voice.is_listening(),
                voice_supported: self.voice.is_supported(),
            },
        }
    }
}
