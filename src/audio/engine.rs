use std::collections::HashMap;
use std::sync::Arc;

use crate::audio_api::{AudioCommand, PlayParams};

use super::frame::StereoFrame;
use super::ids::{SampleId, VoiceId};
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

const MAX_VOICES: usize = 32; // hard cap so we never grow the pool in the callback
const MAX_BLOCK: usize = 4096;

pub struct Engine {
    samples: HashMap<SampleId, Arc<SampleBuffer>>,
    voices: Vec<Option<Voice>>, // fixed pool, None = free slot
    scratch: Vec<StereoFrame>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            samples: HashMap::new(),
            voices: vec![None; MAX_VOICES],
            scratch: vec![StereoFrame::SILENT; MAX_BLOCK],
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::Play(params) => self.start_voice(params),
            AudioCommand::Stop(id) => {
                if let Some(slot) = self.slot_of(id) {
                    self.voices[slot] = None;
                }
            }
            AudioCommand::SetGain(id, gain) => {
                if let Some(slot) = self.slot_of(id) {
                    if let Some(voice) = self.voices[slot].as_mut() {
                        voice.set_gain(gain);
                    }
                }
            }
            AudioCommand::SetRate(id, rate) => {
                if let Some(slot) = self.slot_of(id) {
                    if let Some(voice) = self.voices[slot].as_mut() {
                        voice.set_rate(rate);
                    }
                }
            }
            AudioCommand::StopAll => {
                for slot in self.voices.iter_mut() {
                    *slot = None;
                }
            }
        }
    }

    fn slot_of(&self, id: VoiceId) -> Option<usize> {
        self.voices
            .iter()
            .position(|v| v.as_ref().is_some_and(|v| v.id == id))
    }

    fn start_voice(&mut self, p: PlayParams) {
        if !self.samples.contains_key(&p.sample) {
            return; // never registered; nothing to play
        }
        // free slot first, otherwise steal slot 0
        let slot = self.voices.iter().position(|v| v.is_none()).unwrap_or(0);
        self.voices[slot] = Some(Voice::new(p.voice, p.sample, p.rate, p.gain, p.delay_frames));
    }

    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    // Mix every live voice into `out`, which is cleared first.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::SILENT);
        for slot in self.voices.iter_mut() {
            let Some(voice) = slot else { continue };
            match self.samples.get(&voice.sample) {
                Some(buffer) => voice.render_into(buffer, out),
                None => voice.stop(),
            }
            if !voice.active {
                *slot = None;
            }
        }
        for frame in out.iter_mut() {
            *frame = frame.clipped();
        }
    }

    // Fill an interleaved device buffer with `channels` channels per frame.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        for chunk in data.chunks_mut(MAX_BLOCK * channels) {
            let n_frames = chunk.len() / channels;
            self.render_block(&mut scratch[..n_frames]);
            for (out, frame) in chunk.chunks_exact_mut(channels).zip(scratch.iter()) {
                match out {
                    [mono] => *mono = (frame.left + frame.right) * 0.5,
                    [left, right, rest @ ..] => {
                        *left = frame.left;
                        *right = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        }
        self.scratch = scratch;
    }
}
