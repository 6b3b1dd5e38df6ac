// Loop controller: repeats a sound every `base_interval / tempo` by
// firing a fresh one-shot on each tick. The deadline lives in the state
// itself, so stopping drops it and nothing can fire afterwards.
use std::time::Duration;

use tracing::{debug, warn};

use crate::tempo::Tempo;

use super::playback::{PlayOptions, Playback, PlaybackHandle};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoopState {
    Idle,
    Active {
        current: PlaybackHandle,
        next_fire: Duration,
    },
}

#[derive(Clone, Debug)]
pub struct SoundLoop {
    source: String,
    base_interval: Duration,
    tempo: Tempo,
    volume: f32,
    state: LoopState,
}

impl SoundLoop {
    pub fn new(source: impl Into<String>, base_interval: Duration, tempo: Tempo) -> Self {
        Self {
            source: source.into(),
            base_interval,
            tempo,
            volume: 1.0,
            state: LoopState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, LoopState::Active { .. })
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn period(&self) -> Duration {
        self.tempo.period(self.base_interval)
    }

    fn options(&self) -> PlayOptions {
        PlayOptions {
            rate: self.tempo.multiplier(),
            volume: self.volume,
            start_offset: Duration::ZERO,
        }
    }

    // Idle → Active: play once right away and arm the first deadline.
    // Already active loops are left alone.
    pub fn start(&mut self, now: Duration, playback: &mut Playback) {
        if self.is_active() {
            return;
        }
        let current = playback.play(&self.source, self.options());
        self.state = LoopState::Active {
            current,
            next_fire: now + self.period(),
        };
        debug!(source = %self.source, period = ?self.period(), "loop started");
    }

    // Fire if the deadline has passed. Returns whether a repetition
    // started.
    pub fn tick(&mut self, now: Duration, playback: &mut Playback) -> bool {
        let LoopState::Active { current, next_fire } = self.state else {
            return false;
        };
        if now < next_fire {
            return false;
        }
        playback.stop(current);
        let current = playback.play(&self.source, self.options());

        let period = self.period();
        let mut next = next_fire + period;
        if next <= now {
            // fell behind by more than a whole period; don't burst to catch up
            next = now + period;
        }
        self.state = LoopState::Active { current, next_fire: next };
        true
    }

    // Clamp to the tempo range and retune the sound that is playing. The
    // deadline already armed stays where it is; the period after it uses
    // the new tempo.
    pub fn set_tempo(&mut self, tempo: Tempo, playback: &mut Playback) {
        self.tempo = tempo;
        if let LoopState::Active { current, .. } = self.state {
            playback.set_rate(current, tempo.multiplier());
        }
    }

    pub fn set_volume(&mut self, volume: f32, playback: &mut Playback) {
        self.volume = volume.clamp(0.0, 1.0);
        if let LoopState::Active { current, .. } = self.state {
            playback.set_volume(current, self.volume);
        }
    }

    // the repetition behind `handle` never loaded: go idle instead of
    // refetching every period. Returns whether this loop owned it.
    pub fn abandon(&mut self, handle: PlaybackHandle) -> bool {
        match self.state {
            LoopState::Active { current, .. } if current == handle => {
                self.state = LoopState::Idle;
                warn!(source = %self.source, "sound failed to load, loop stopped");
                true
            }
            _ => false,
        }
    }

    // Active → Idle. The deadline is dropped before the sound is stopped.
    // Stopping an idle loop does nothing.
    pub fn stop(&mut self, playback: &mut Playback) {
        let previous = std::mem::replace(&mut self.state, LoopState::Idle);
        if let LoopState::Active { current, .. } = previous {
            playback.stop(current);
            debug!(source = %self.source, "loop stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::AudioCommand;
    use crate::pipeline::playback::testing::{plays, stops, warm_playback};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    // Drive the loop with a 10 ms tick, like the UI loop would, and record
    // when each repetition started.
    fn run(lp: &mut SoundLoop, pb: &mut Playback, from: u64, to: u64) -> Vec<u64> {
        let mut fired = Vec::new();
        let mut t = from;
        while t <= to {
            if lp.tick(ms(t), pb) {
                fired.push(t);
            }
            t += 10;
        }
        fired
    }

    #[test]
    fn fires_every_base_interval_at_normal_tempo() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        assert_eq!(plays(&pb.take_commands()).len(), 1);

        assert_eq!(run(&mut lp, &mut pb, 10, 1600), vec![500, 1000, 1500]);
    }

    #[test]
    fn tempo_change_applies_from_the_next_tick() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        assert_eq!(run(&mut lp, &mut pb, 10, 600), vec![500]);

        // next deadline is 1000; doubling the tempo doesn't pull it in
        lp.set_tempo(Tempo::MAX, &mut pb);
        assert_eq!(run(&mut lp, &mut pb, 610, 1800), vec![1000, 1250, 1500, 1750]);
    }

    #[test]
    fn set_tempo_retunes_the_playing_sound() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        pb.take_commands();
        lp.set_tempo(Tempo::from_multiplier(1.5), &mut pb);
        let cmds = pb.take_commands();
        assert!(matches!(cmds.as_slice(), [AudioCommand::SetRate(_, r)] if *r == 1.5));
    }

    #[test]
    fn each_tick_replaces_the_previous_instance() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        let first = plays(&pb.take_commands())[0].voice;

        assert!(lp.tick(ms(500), &mut pb));
        let cmds = pb.take_commands();
        assert_eq!(stops(&cmds), vec![first]);
        let second = plays(&cmds)[0].voice;
        assert_ne!(first, second);
        assert_eq!(plays(&cmds)[0].rate, 1.0);
    }

    #[test]
    fn stop_is_final_and_idempotent() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.stop(&mut pb); // idle: no-op
        assert!(pb.take_commands().is_empty());

        lp.start(ms(0), &mut pb);
        lp.stop(&mut pb);
        lp.stop(&mut pb);
        assert!(!lp.is_active());
        let cmds = pb.take_commands();
        assert_eq!(stops(&cmds).len(), 1);

        assert!(run(&mut lp, &mut pb, 0, 3000).is_empty());
        assert!(pb.take_commands().is_empty());
    }

    #[test]
    fn start_twice_does_not_double_play() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        lp.start(ms(5), &mut pb);
        assert_eq!(plays(&pb.take_commands()).len(), 1);
    }

    #[test]
    fn does_not_burst_after_a_stall() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        assert!(lp.tick(ms(2600), &mut pb));
        assert!(!lp.tick(ms(2610), &mut pb));
        assert!(matches!(lp.state(), LoopState::Active { next_fire, .. } if next_fire == ms(3100)));
    }

    #[test]
    fn abandon_only_matches_the_current_repetition() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(500), Tempo::NORMAL);
        lp.start(ms(0), &mut pb);
        let LoopState::Active { current: first, .. } = lp.state() else {
            panic!("loop should be running");
        };
        lp.tick(ms(500), &mut pb);
        let LoopState::Active { current, .. } = lp.state() else {
            panic!("loop should be running");
        };
        assert!(!lp.abandon(first));

        let other = pb.play("drum.wav", PlayOptions::default());
        assert!(!lp.abandon(other));
        assert!(lp.is_active());
        assert!(lp.abandon(current));
        assert!(!lp.is_active());
        assert!(run(&mut lp, &mut pb, 500, 3000).is_empty());
    }

    #[test]
    fn idle_tempo_change_is_just_stored() {
        let (mut pb, _) = warm_playback(&[("drum.wav", 100)]);
        let mut lp = SoundLoop::new("drum.wav", ms(1000), Tempo::NORMAL);
        lp.set_tempo(Tempo::MIN, &mut pb);
        assert!(pb.take_commands().is_empty());
        assert_eq!(lp.period(), ms(2000));
    }
}
