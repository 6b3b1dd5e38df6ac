use super::frame::StereoFrame;
use super::ids::{SampleId, VoiceId};
use super::sample_buffer::SampleBuffer;

// One-shot playback of a registered buffer. Each loop repetition and each
// preview is its own voice; nothing here ever wraps around.
#[derive(Clone, Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub sample: SampleId,
    pub pos: f32,
    pub rate: f32,
    pub gain: f32,
    pub active: bool,
    delay: usize, // frames of silence before the first sample
}

impl Voice {
    pub fn new(id: VoiceId, sample: SampleId, rate: f32, gain: f32, delay: usize) -> Self {
        Self {
            id,
            sample,
            pos: 0.0,
            rate: sanitize_rate(rate),
            gain: gain.clamp(0.0, 1.0),
            active: true,
            delay,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = sanitize_rate(rate);
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let data = &buffer.data;
        let len = data.len();
        if len == 0 {
            self.active = false;
            return;
        }

        let skip = self.delay.min(out.len());
        self.delay -= skip;

        for frame in out[skip..].iter_mut() {
            let i = self.pos as usize;
            if i >= len {
                self.active = false;
                break;
            }
            let frac = self.pos - i as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);
            frame.add_scaled(s0.lerp(s1, frac), self.gain);
            self.pos += self.rate;
        }
    }
}

fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() && rate > 0.0 { rate } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> SampleBuffer {
        SampleBuffer {
            data: (0..len).map(|i| StereoFrame::mono(i as f32 / 10.0)).collect(),
            sample_rate: 44_100,
        }
    }

    #[test]
    fn plays_through_then_finishes() {
        let buffer = ramp(4);
        let mut voice = Voice::new(VoiceId(0), SampleId(0), 1.0, 1.0, 0);
        let mut out = [StereoFrame::SILENT; 6];
        voice.render_into(&buffer, &mut out);
        assert_eq!(out[3], StereoFrame::mono(0.3));
        assert_eq!(out[4], StereoFrame::SILENT);
        assert!(!voice.active);
    }

    #[test]
    fn double_rate_skips_frames() {
        let buffer = ramp(8);
        let mut voice = Voice::new(VoiceId(0), SampleId(0), 2.0, 1.0, 0);
        let mut out = [StereoFrame::SILENT; 3];
        voice.render_into(&buffer, &mut out);
        assert_eq!(out[1], StereoFrame::mono(0.2));
        assert_eq!(out[2], StereoFrame::mono(0.4));
        assert!(voice.active);
    }

    #[test]
    fn delay_spans_blocks() {
        let buffer = ramp(4);
        let mut voice = Voice::new(VoiceId(0), SampleId(0), 1.0, 1.0, 3);
        let mut first = [StereoFrame::SILENT; 2];
        voice.render_into(&buffer, &mut first);
        assert_eq!(first, [StereoFrame::SILENT; 2]);

        let mut second = [StereoFrame::SILENT; 3];
        voice.render_into(&buffer, &mut second);
        assert_eq!(second[0], StereoFrame::SILENT);
        assert_eq!(second[1], StereoFrame::mono(0.0));
        assert_eq!(second[2], StereoFrame::mono(0.1));
    }

    #[test]
    fn gain_is_clamped_and_applied() {
        let buffer = SampleBuffer { data: vec![StereoFrame::mono(0.5)], sample_rate: 44_100 };
        let mut voice = Voice::new(VoiceId(0), SampleId(0), 1.0, 3.0, 0);
        assert_eq!(voice.gain, 1.0);
        voice.set_gain(0.5);
        let mut out = [StereoFrame::SILENT; 1];
        voice.render_into(&buffer, &mut out);
        assert_eq!(out[0], StereoFrame::mono(0.25));
    }

    #[test]
    fn bad_rate_falls_back_to_normal() {
        let mut voice = Voice::new(VoiceId(0), SampleId(0), 0.0, 1.0, 0);
        assert_eq!(voice.rate, 1.0);
        voice.set_rate(f32::INFINITY);
        assert_eq!(voice.rate, 1.0);
        voice.set_rate(1.5);
        assert_eq!(voice.rate, 1.5);
    }
}
