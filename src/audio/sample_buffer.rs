use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer as PcmBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::frame::StereoFrame;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("unsupported wav sample format {0:?}")]
    UnsupportedFormat(hound::SampleFormat),
    #[error("decode: {0}")]
    Symphonia(#[from] SymphoniaError),
    #[error("no audio track found")]
    NoTrack,
    #[error("file contains no audio")]
    Empty,
}

/// Fully decoded audio, already converted to the output device's rate.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    // Build a buffer from interleaved samples of any channel count. Mono is
    // duplicated to both sides, anything wider keeps its first two channels.
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        source_rate: u32,
        target_rate: u32,
    ) -> Result<Self, DecodeError> {
        if samples.is_empty() || channels == 0 {
            return Err(DecodeError::Empty);
        }
        let frames: Vec<StereoFrame> = if channels == 1 {
            samples.iter().map(|&x| StereoFrame::mono(x)).collect()
        } else {
            samples
                .chunks_exact(channels)
                .map(|c| StereoFrame { left: c[0], right: c[1] })
                .collect()
        };
        if frames.is_empty() {
            return Err(DecodeError::Empty);
        }
        let data = if source_rate != target_rate {
            resample_linear(&frames, source_rate, target_rate)
        } else {
            frames
        };
        Ok(Self { data, sample_rate: target_rate })
    }

    // Decode whatever is at `path`. WAV goes through hound; every other
    // container is probed by symphonia.
    pub fn decode_file(path: &Path, target_rate: u32) -> Result<Self, DecodeError> {
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if is_wav {
            Self::load_wav(path, target_rate)
        } else {
            Self::load_compressed(path, target_rate)
        }
    }

    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self, DecodeError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int if spec.bits_per_sample <= 32 => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
            other => return Err(DecodeError::UnsupportedFormat(other)),
        };

        Self::from_interleaved(&samples, spec.channels as usize, spec.sample_rate, target_rate)
    }

    fn load_compressed(path: &Path, target_rate: u32) -> Result<Self, DecodeError> {
        let file = File::open(path).map_err(SymphoniaError::IoError)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

        let mut source_rate = codec_params.sample_rate.unwrap_or(target_rate);
        let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // a corrupt packet costs a few ms of audio, not the whole sound
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            let spec = *decoded.spec();
            source_rate = spec.rate;
            channels = spec.channels.count();
            let mut pcm = PcmBuffer::<f32>::new(decoded.capacity() as u64, spec);
            pcm.copy_interleaved_ref(decoded);
            samples.extend_from_slice(pcm.samples());
        }

        Self::from_interleaved(&samples, channels, source_rate, target_rate)
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.last().copied().unwrap_or(StereoFrame::SILENT);

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx + 1 >= frames.len() {
                last
            } else {
                let frac = (src_pos - idx as f64) as f32;
                frames[idx].lerp(frames[idx + 1], frac)
            }
        })
        .collect()
}
