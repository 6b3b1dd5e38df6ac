use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{error, info, warn};

use crate::audio_api::AudioCommand;

mod engine;
mod frame;
mod ids;
mod sample_buffer;
mod voice;

pub use frame::StereoFrame;
pub use ids::{IdCounter, SampleId, VoiceId};
pub use sample_buffer::{DecodeError, SampleBuffer};

use engine::Engine;

// The open output device. Dropping it closes the stream and releases the
// hardware, so teardown is: send the final commands, then drop this.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        match self.tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("audio command queue full, dropping command"),
            Err(TrySendError::Disconnected(_)) => error!("audio thread is gone"),
        }
    }

    pub fn send_all(&self, cmds: impl IntoIterator<Item = AudioCommand>) {
        for cmd in cmds {
            self.send(cmd);
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels,
        "opening audio output"
    );

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(&device, &config.into(), rx, channels)?;
            output_stream.play().context("failed to play output stream")?;
            Ok(AudioHandle {
                tx,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 is supported)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new();

    let err_fn = |err| error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }
            engine.render_interleaved(data, channels);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
