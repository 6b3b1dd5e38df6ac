// one-shot playback on top of the buffer cache. a play whose buffer isn't
// decoded yet is parked until the load lands

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use crate::audio::{IdCounter, SampleId, VoiceId};
use crate::audio_api::{AudioCommand, PlayParams};
use crate::loader::cache::{BufferCache, CacheEvent, Lookup, PreloadReport};

// Handle to one playing (or about to play) instance of a sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(VoiceId);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayOptions {
    pub rate: f32,
    pub volume: f32,
    pub start_offset: Duration,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
            start_offset: Duration::ZERO,
        }
    }
}

impl PlayOptions {
    pub fn at_rate(rate: f32) -> Self {
        Self { rate, ..Self::default() }
    }
}

#[derive(Debug)]
struct ParkedPlay {
    locator: String,
    options: PlayOptions,
    tracked: bool,
}

pub struct Playback {
    cache: BufferCache,
    sample_rate: u32,
    voices: IdCounter,
    live: HashSet<VoiceId>,
    parked: HashMap<VoiceId, ParkedPlay>,
    failed: Vec<PlaybackHandle>,
    commands: Vec<AudioCommand>,
}

impl Playback {
    pub fn new(cache: BufferCache, sample_rate: u32) -> Self {
        Self {
            cache,
            sample_rate,
            voices: IdCounter::default(),
            live: HashSet::new(),
            parked: HashMap::new(),
            failed: Vec::new(),
            commands: Vec::new(),
        }
    }

    // Start `locator` now (or after `start_offset`). The returned handle
    // stays valid until stop(); a parked play can be stopped
    // before it ever makes a sound.
    pub fn play(&mut self, locator: &str, options: PlayOptions) -> PlaybackHandle {
        let voice = VoiceId(self.voices.next());
        self.start_or_park(voice, locator, options, true);
        PlaybackHandle(voice)
    }

    // Fire-and-forget one-shot. Nothing is tracked, the voice simply
    // runs to its end.
    pub fn fire(&mut self, locator: &str, options: PlayOptions) {
        let voice = VoiceId(self.voices.next());
        self.start_or_park(voice, locator, options, false);
    }

    fn start_or_park(&mut self, voice: VoiceId, locator: &str, options: PlayOptions, tracked: bool) {
        match self.cache.ensure(locator) {
            Lookup::Ready(sample) => self.start(voice, sample, options, tracked),
            Lookup::Pending => {
                debug!(%locator, ?voice, "waiting for sound to load");
                self.parked.insert(
                    voice,
                    ParkedPlay { locator: locator.to_string(), options, tracked },
                );
            }
        }
    }

    fn start(&mut self, voice: VoiceId, sample: SampleId, options: PlayOptions, tracked: bool) {
        let delay_frames = (options.start_offset.as_secs_f64() * self.sample_rate as f64) as usize;
        self.commands.push(AudioCommand::Play(PlayParams {
            voice,
            sample,
            rate: options.rate,
            gain: options.volume.clamp(0.0, 1.0),
            delay_frames,
        }));
        if tracked {
            self.live.insert(voice);
        }
    }

    // Safe to call any number of times, on any handle.
    pub fn stop(&mut self, handle: PlaybackHandle) {
        let PlaybackHandle(voice) = handle;
        if self.parked.remove(&voice).is_some() {
            return;
        }
        if self.live.remove(&voice) {
            self.commands.push(AudioCommand::Stop(voice));
        }
    }

    pub fn set_volume(&mut self, handle: PlaybackHandle, volume: f32) {
        let PlaybackHandle(voice) = handle;
        let volume = volume.clamp(0.0, 1.0);
        if let Some(parked) = self.parked.get_mut(&voice) {
            parked.options.volume = volume;
        } else if self.live.contains(&voice) {
            self.commands.push(AudioCommand::SetGain(voice, volume));
        }
    }

    pub fn set_rate(&mut self, handle: PlaybackHandle, rate: f32) {
        let PlaybackHandle(voice) = handle;
        if let Some(parked) = self.parked.get_mut(&voice) {
            parked.options.rate = rate;
        } else if self.live.contains(&voice) {
            self.commands.push(AudioCommand::SetRate(voice, rate));
        }
    }

    pub fn preload<'a>(&mut self, locators: impl IntoIterator<Item = &'a str>) {
        self.cache.preload(locators);
    }

    pub fn take_preload_report(&mut self) -> Option<PreloadReport> {
        self.cache.take_preload_report()
    }

    pub fn is_cached(&self, locator: &str) -> bool {
        self.cache.get(locator).is_some()
    }

    pub fn is_loading(&self, locator: &str) -> bool {
        self.cache.is_loading(locator)
    }

    // Pick up finished loads: register them with the engine and start any
    // play that was waiting on them.
    pub fn poll(&mut self) {
        for event in self.cache.poll() {
            self.on_cache_event(event);
        }
    }

    fn on_cache_event(&mut self, event: CacheEvent) {
        match event {
            CacheEvent::Ready { locator, id, buffer } => {
                self.commands.push(AudioCommand::RegisterSample { id, buffer });
                for (voice, parked) in self.take_parked(&locator) {
                    self.start(voice, id, parked.options, parked.tracked);
                }
            }
            CacheEvent::Failed { locator, .. } => {
                let dropped = self.take_parked(&locator);
                if !dropped.is_empty() {
                    warn!(%locator, dropped = dropped.len(), "sound failed to load, skipping playback");
                }
                // tracked plays are reported so their owner can give up
                self.failed.extend(
                    dropped
                        .into_iter()
                        .filter(|(_, parked)| parked.tracked)
                        .map(|(voice, _)| PlaybackHandle(voice)),
                );
            }
        }
    }

    fn take_parked(&mut self, locator: &str) -> Vec<(VoiceId, ParkedPlay)> {
        let voices: Vec<VoiceId> = self
            .parked
            .iter()
            .filter(|(_, p)| p.locator == locator)
            .map(|(v, _)| *v)
            .collect();
        let mut plays: Vec<(VoiceId, ParkedPlay)> = voices
            .into_iter()
            .filter_map(|v| self.parked.remove(&v).map(|p| (v, p)))
            .collect();
        plays.sort_by_key(|(v, _)| v.0);
        plays
    }

    // handles from `play` whose sound failed to load since the last call
    pub fn take_failed(&mut self) -> Vec<PlaybackHandle> {
        std::mem::take(&mut self.failed)
    }

    pub fn take_commands(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }

    // Teardown: forget every parked play and silence every voice.
    pub fn close(&mut self) {
        self.parked.clear();
        self.live.clear();
        self.failed.clear();
        self.commands.push(AudioCommand::StopAll);
    }
}

#[cfg(test)]
impl Playback {
    pub fn is_playing(&self, handle: PlaybackHandle) -> bool {
        self.live.contains(&handle.0) || self.parked.contains_key(&handle.0)
    }

    pub fn wait_for_loads(&mut self) {
        for event in self.cache.wait_idle() {
            self.on_cache_event(event);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn plays_cached_sound_immediately() {
        let (mut playback, _) = warm_playback(&[("kick.wav", 10)]);
        let handle = playback.play("kick.wav", PlayOptions { rate: 1.5, volume: 0.5, start_offset: Duration::from_millis(20) });
        let cmds = playback.take_commands();
        let p = plays(&cmds);
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].voice, handle.0);
        assert_eq!(p[0].rate, 1.5);
        assert_eq!(p[0].gain, 0.5);
        assert_eq!(p[0].delay_frames, 20);
        assert!(playback.is_playing(handle));
    }

    #[test]
    fn parks_until_loaded_then_registers_and_plays() {
        let (mut playback, _) = playback_with(&[("clap.wav", 4)]);
        let handle = playback.play("clap.wav", PlayOptions::default());
        assert!(playback.take_commands().is_empty());
        assert!(playback.is_playing(handle));

        playback.wait_for_loads();
        let cmds = playback.take_commands();
        assert!(matches!(cmds[0], AudioCommand::RegisterSample { .. }));
        assert_eq!(plays(&cmds)[0].voice, handle.0);
    }

    #[test]
    fn stopping_a_parked_play_cancels_it() {
        let (mut playback, _) = playback_with(&[("clap.wav", 4)]);
        let handle = playback.play("clap.wav", PlayOptions::default());
        playback.stop(handle);
        assert!(!playback.is_playing(handle));

        playback.wait_for_loads();
        let cmds = playback.take_commands();
        assert!(plays(&cmds).is_empty());
        assert!(stops(&cmds).is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut playback, _) = warm_playback(&[("kick.wav", 10)]);
        let handle = playback.play("kick.wav", PlayOptions::default());
        playback.take_commands();
        playback.stop(handle);
        playback.stop(handle);
        playback.stop(handle);
        assert_eq!(stops(&playback.take_commands()), vec![handle.0]);
    }

    #[test]
    fn volume_is_clamped_and_rate_is_live() {
        let (mut playback, _) = warm_playback(&[("kick.wav", 10)]);
        let handle = playback.play("kick.wav", PlayOptions::default());
        playback.take_commands();
        playback.set_volume(handle, 4.0);
        playback.set_rate(handle, 2.0);
        let cmds = playback.take_commands();
        assert!(matches!(cmds[0], AudioCommand::SetGain(v, g) if v == handle.0 && g == 1.0));
        assert!(matches!(cmds[1], AudioCommand::SetRate(v, r) if v == handle.0 && r == 2.0));

        playback.stop(handle);
        playback.take_commands();
        playback.set_volume(handle, 0.3);
        assert!(playback.take_commands().is_empty());
    }

    #[test]
    fn parked_play_picks_up_later_changes() {
        let (mut playback, _) = playback_with(&[("clap.wav", 4)]);
        let handle = playback.play("clap.wav", PlayOptions::default());
        playback.set_rate(handle, 0.5);
        playback.set_volume(handle, -1.0);
        playback.wait_for_loads();
        let cmds = playback.take_commands();
        let p = plays(&cmds);
        assert_eq!(p[0].rate, 0.5);
        assert_eq!(p[0].gain, 0.0);
    }

    #[test]
    fn failed_load_drops_the_play() {
        let (mut playback, loader) = playback_with(&[]);
        let handle = playback.play("missing.wav", PlayOptions::default());
        playback.wait_for_loads();
        assert!(playback.take_commands().is_empty());
        assert!(!playback.is_playing(handle));

        // asking again retries the fetch
        loader.add("missing.wav", 3);
        playback.play("missing.wav", PlayOptions::default());
        playback.wait_for_loads();
        assert_eq!(plays(&playback.take_commands()).len(), 1);
        assert_eq!(loader.calls("missing.wav"), 2);
    }

    #[test]
    fn failed_tracked_plays_are_reported_once() {
        let (mut playback, _) = playback_with(&[]);
        let tracked = playback.play("missing.wav", PlayOptions::default());
        playback.fire("missing.wav", PlayOptions::default());
        playback.wait_for_loads();
        assert_eq!(playback.take_failed(), vec![tracked]);
        assert!(playback.take_failed().is_empty());
    }

    #[test]
    fn fire_is_untracked() {
        let (mut playback, _) = warm_playback(&[("kick.wav", 10)]);
        playback.fire("kick.wav", PlayOptions::at_rate(2.0));
        let cmds = playback.take_commands();
        assert_eq!(plays(&cmds)[0].rate, 2.0);
        assert!(playback.live.is_empty());
    }

    #[test]
    fn close_silences_everything() {
        let (mut playback, _) = playback_with(&[("kick.wav", 10)]);
        let parked = playback.play("kick.wav", PlayOptions::default());
        playback.close();
        assert!(!playback.is_playing(parked));
        assert!(matches!(playback.take_commands().as_slice(), [AudioCommand::StopAll]));
        playback.wait_for_loads();
        assert!(plays(&playback.take_commands()).is_empty());
    }
}
