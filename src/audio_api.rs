use std::sync::Arc;

pub use crate::audio::{SampleBuffer, SampleId, VoiceId};

#[derive(Clone, Debug, PartialEq)]
pub struct PlayParams {
    pub voice: VoiceId,
    pub sample: SampleId,
    pub rate: f32,
    pub gain: f32,
    pub delay_frames: usize,
}

// Everything the control side can ask of the audio thread.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine never touches the filesystem: buffers are decoded on a
    // worker, cached, and handed over here before any Play can use them.
    RegisterSample { id: SampleId, buffer: Arc<SampleBuffer> },

    Play(PlayParams),
    Stop(VoiceId),
    SetGain(VoiceId, f32),
    SetRate(VoiceId, f32),

    // Teardown: silence every voice at once.
    StopAll,
}
