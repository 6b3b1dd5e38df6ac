use std::time::Duration;

use tracing::info;

use crate::catalog::SoundDef;
use crate::tempo::Tempo;

use super::playback::{PlayOptions, Playback};
use super::sound_loop::SoundLoop;

const VOLUME_STEP: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

/// A catalog sound placed on the board, with its own loop.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    pub sound: SoundDef,
    pub volume: f32,
    looper: SoundLoop,
}

impl Track {
    pub fn is_active(&self) -> bool {
        self.looper.is_active()
    }

    pub fn tempo(&self) -> Tempo {
        self.looper.tempo()
    }
}

// The ordered list of tracks on the board. Every loop is owned here, so
// stopping everything is a walk over the list.
#[derive(Debug, Default)]
pub struct TrackList {
    tracks: Vec<Track>,
    next_id: u64,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<TrackId> {
        self.tracks.get(index).map(|t| t.id)
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    // A sound dropped onto the board: appended, not looping, at the
    // sound's default tempo.
    pub fn add(&mut self, sound: &SoundDef) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        self.tracks.push(Track {
            id,
            sound: sound.clone(),
            volume: 1.0,
            looper: SoundLoop::new(sound.source.clone(), sound.base_interval(), sound.default_tempo),
        });
        info!(track = id.0, sound = %sound.label, "track added");
        id
    }

    // Start or stop the track's loop. Returns the new active flag.
    pub fn toggle(&mut self, id: TrackId, now: Duration, playback: &mut Playback) -> Option<bool> {
        let track = self.get_mut(id)?;
        if track.looper.is_active() {
            track.looper.stop(playback);
        } else {
            track.looper.start(now, playback);
        }
        Some(track.looper.is_active())
    }

    // Move the tempo by `steps` increments of 0.1, clamped to the range.
    pub fn adjust_tempo(&mut self, id: TrackId, steps: i32, playback: &mut Playback) -> Option<Tempo> {
        let track = self.get_mut(id)?;
        let tempo = track.looper.tempo().stepped(steps);
        track.looper.set_tempo(tempo, playback);
        Some(tempo)
    }

    pub fn adjust_volume(&mut self, id: TrackId, steps: i32, playback: &mut Playback) -> Option<f32> {
        let track = self.get_mut(id)?;
        let volume = (track.volume + steps as f32 * VOLUME_STEP).clamp(0.0, 1.0);
        // snap to tenths so repeated presses don't accumulate float error
        track.volume = (volume * 10.0).round() / 10.0;
        track.looper.set_volume(track.volume, playback);
        Some(track.volume)
    }

    // One-shot at the track's tempo, independent of its loop.
    pub fn preview(&self, id: TrackId, playback: &mut Playback) -> bool {
        let Some(track) = self.get(id) else {
            return false;
        };
        playback.fire(
            &track.sound.source,
            PlayOptions {
                volume: track.volume,
                ..PlayOptions::at_rate(track.tempo().multiplier())
            },
        );
        true
    }

    // Force the loop idle, then delete the track.
    pub fn remove(&mut self, id: TrackId, playback: &mut Playback) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tracks[index].looper.stop(playback);
        let track = self.tracks.remove(index);
        info!(track = track.id.0, sound = %track.sound.label, "track removed");
        true
    }

    pub fn active_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_active()).count()
    }

    pub fn stop_all(&mut self, playback: &mut Playback) {
        for track in self.tracks.iter_mut() {
            track.looper.stop(playback);
        }
    }

    // One tempo for every running loop. Idle tracks keep their own.
    pub fn set_all_tempo(&mut self, tempo: Tempo, playback: &mut Playback) -> usize {
        let mut retuned = 0;
        for track in self.tracks.iter_mut().filter(|t| t.is_active()) {
            track.looper.set_tempo(tempo, playback);
            retuned += 1;
        }
        info!(%tempo, retuned, "tempo set on all loops");
        retuned
    }

    // Give every active loop a chance to fire. Loops whose sound failed
    // to load go idle first; their ids are returned.
    pub fn tick(&mut self, now: Duration, playback: &mut Playback) -> Vec<TrackId> {
        let failed = playback.take_failed();
        let mut stalled = Vec::new();
        for track in self.tracks.iter_mut() {
            if failed.iter().any(|&handle| track.looper.abandon(handle)) {
                stalled.push(track.id);
            }
            track.looper.tick(now, playback);
        }
        stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::AudioCommand;
    use crate::catalog::{self, SoundId};
    use crate::pipeline::playback::testing::{playback_with, plays, stops, warm_playback};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn drum() -> SoundDef {
        SoundDef {
            id: SoundId(1),
            label: "Drums".into(),
            color: "#FFB6C1".into(),
            source: "drum.wav".into(),
            default_tempo: Tempo::NORMAL,
            base_interval_ms: 500,
            category: "percussion".into(),
        }
    }

    #[test]
    fn dropped_sounds_append_inactive_at_default_tempo() {
        let mut tracks = TrackList::new();
        let mut fast = drum();
        fast.default_tempo = Tempo::from_multiplier(1.5);
        let a = tracks.add(&drum());
        let b = tracks.add(&fast);
        let c = tracks.add(&drum());

        assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, b, c]);
        assert!(tracks.iter().all(|t| !t.is_active()));
        assert_eq!(tracks.get(b).unwrap().tempo(), Tempo::from_multiplier(1.5));
        assert_ne!(a, c);
    }

    #[test]
    fn toggle_drives_the_loop() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let id = tracks.add(&drum());

        assert_eq!(tracks.toggle(id, ms(0), &mut pb), Some(true));
        assert_eq!(plays(&pb.take_commands()).len(), 1);
        assert_eq!(tracks.active_count(), 1);

        assert_eq!(tracks.toggle(id, ms(100), &mut pb), Some(false));
        assert_eq!(stops(&pb.take_commands()).len(), 1);
        assert_eq!(tracks.toggle(TrackId(99), ms(0), &mut pb), None);
    }

    #[test]
    fn tempo_steps_clamp() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let id = tracks.add(&drum());
        for _ in 0..20 {
            tracks.adjust_tempo(id, 1, &mut pb);
        }
        assert_eq!(tracks.get(id).unwrap().tempo(), Tempo::MAX);
        for _ in 0..30 {
            tracks.adjust_tempo(id, -1, &mut pb);
        }
        assert_eq!(tracks.get(id).unwrap().tempo(), Tempo::MIN);
        assert_eq!(tracks.adjust_tempo(id, 1, &mut pb), Some(Tempo::from_multiplier(0.6)));
    }

    #[test]
    fn removing_an_active_track_leaves_nothing_running() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let keep = tracks.add(&drum());
        let gone = tracks.add(&drum());
        tracks.toggle(gone, ms(0), &mut pb);
        let voice = plays(&pb.take_commands())[0].voice;

        assert!(tracks.remove(gone, &mut pb));
        assert_eq!(stops(&pb.take_commands()), vec![voice]);
        assert!(!tracks.remove(gone, &mut pb));

        // well past one base interval: nothing fires
        let mut t = 0;
        while t <= 2000 {
            tracks.tick(ms(t), &mut pb);
            t += 10;
        }
        assert!(pb.take_commands().is_empty());
        assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![keep]);
    }

    #[test]
    fn preview_is_independent_of_the_loop() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let id = tracks.add(&drum());
        tracks.adjust_tempo(id, 5, &mut pb);
        assert!(tracks.preview(id, &mut pb));
        let cmds = pb.take_commands();
        assert_eq!(plays(&cmds)[0].rate, 1.5);
        assert!(!tracks.get(id).unwrap().is_active());
        assert!(!tracks.preview(TrackId(42), &mut pb));
    }

    #[test]
    fn stop_all_idles_every_loop() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        for sound in catalog::builtin().iter().take(3) {
            let mut sound = sound.clone();
            sound.source = "drum.wav".into();
            let id = tracks.add(&sound);
            tracks.toggle(id, ms(0), &mut pb);
        }
        pb.take_commands();
        tracks.stop_all(&mut pb);
        assert_eq!(tracks.active_count(), 0);
        assert_eq!(stops(&pb.take_commands()).len(), 3);
    }

    #[test]
    fn volume_steps_clamp_and_reach_the_voice() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let id = tracks.add(&drum());
        tracks.toggle(id, ms(0), &mut pb);
        pb.take_commands();
        assert_eq!(tracks.adjust_volume(id, -3, &mut pb), Some(0.7));
        assert_eq!(pb.take_commands().len(), 1);
        assert_eq!(tracks.adjust_volume(id, 9, &mut pb), Some(1.0));
        assert_eq!(tracks.adjust_volume(id, -20, &mut pb), Some(0.0));
    }

    #[test]
    fn unloadable_loop_goes_idle_instead_of_refetching() {
        let (mut pb, loader) = playback_with(&[]);
        let mut tracks = TrackList::new();
        let mut missing = drum();
        missing.source = "missing.wav".into();
        missing.base_interval_ms = 250;
        let id = tracks.add(&missing);
        tracks.toggle(id, ms(0), &mut pb);

        let mut stalled = Vec::new();
        let mut t = 0;
        while t <= 2500 {
            pb.wait_for_loads();
            stalled.extend(tracks.tick(ms(t), &mut pb));
            t += 10;
        }
        assert_eq!(loader.calls("missing.wav"), 1);
        assert_eq!(stalled, vec![id]);
        assert!(!tracks.get(id).unwrap().is_active());
        assert!(plays(&pb.take_commands()).is_empty());

        // the user starting it again fetches again
        loader.add("missing.wav", 10);
        tracks.toggle(id, ms(3000), &mut pb);
        pb.wait_for_loads();
        assert_eq!(loader.calls("missing.wav"), 2);
        assert_eq!(plays(&pb.take_commands()).len(), 1);
    }

    #[test]
    fn global_tempo_retunes_running_loops_only() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 10)]);
        let mut tracks = TrackList::new();
        let a = tracks.add(&drum());
        let b = tracks.add(&drum());
        let idle = tracks.add(&drum());
        tracks.toggle(a, ms(0), &mut pb);
        tracks.toggle(b, ms(0), &mut pb);
        pb.take_commands();

        assert_eq!(tracks.set_all_tempo(Tempo::MAX, &mut pb), 2);
        let retuned = pb.take_commands();
        assert_eq!(retuned.len(), 2);
        assert!(retuned.iter().all(|c| matches!(c, AudioCommand::SetRate(_, r) if *r == 2.0)));
        assert_eq!(tracks.get(idle).unwrap().tempo(), Tempo::NORMAL);

        // the armed deadline at 500 stands, then both fire every 250 ms
        let mut fired = Vec::new();
        let mut t = 10;
        while t <= 1100 {
            tracks.tick(ms(t), &mut pb);
            let n = plays(&pb.take_commands()).len();
            if n > 0 {
                fired.push((t, n));
            }
            t += 10;
        }
        assert_eq!(fired, vec![(500, 2), (750, 2), (1000, 2)]);
    }
}
