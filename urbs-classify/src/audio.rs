//! Audio decoding and resampling collaborators.
//!
//! Feature extraction only depends on [`AudioDecoder`]; the WAV and Symphonia
//! backends here are interchangeable implementations of it.

use crate::error::{DecodeError, Result};
use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// File extensions accepted for classification.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];

/// Check whether a path has a supported audio extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Decoded PCM audio at its native rate.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    /// Interleaved samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

/// Basic facts about an audio source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AudioInfo {
    /// Duration in seconds
    pub duration: f32,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Mono audio, already de-interleaved.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / n as usize,
        }
    }

    pub fn info(&self) -> AudioInfo {
        let duration = match self.sample_rate {
            0 => 0.0,
            rate => self.frames() as f32 / rate as f32,
        };

        AudioInfo {
            duration,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Average all channels into one.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidChannels`] for zero channels.
    pub fn into_mono(self) -> Result<Vec<f32>> {
        downmix(self.samples, self.channels)
    }
}

/// Capability that turns an encoded audio source into PCM samples.
pub trait AudioDecoder: Send + Sync {
    /// Decode an audio file.
    fn decode_file(&self, path: &Path) -> Result<DecodedAudio>;

    /// Decode an in-memory audio file; `extension` hints the container format.
    fn decode_bytes(&self, bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio>;
}

/// WAV decoder backed by hound.
#[derive(Clone, Copy, Debug, Default)]
pub struct WavDecoder;

impl WavDecoder {
    fn read<R: std::io::Read>(mut reader: WavReader<R>) -> Result<DecodedAudio> {
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(DecodeError::InvalidChannels(spec.channels).into());
        }

        if spec.sample_rate == 0 {
            return Err(DecodeError::UnknownSampleRate.into());
        }

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<hound::Result<_>>()?,
            (SampleFormat::Int, bits @ 1..=32) => {
                let scale = (1_i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<hound::Result<_>>()?
            }
            (format, bits) => {
                return Err(DecodeError::UnsupportedFormat {
                    bits,
                    format: match format {
                        SampleFormat::Float => "float",
                        SampleFormat::Int => "int",
                    },
                }
                .into());
            }
        };

        Ok(DecodedAudio::new(samples, spec.sample_rate, spec.channels))
    }
}

impl AudioDecoder for WavDecoder {
    fn decode_file(&self, path: &Path) -> Result<DecodedAudio> {
        Self::read(WavReader::open(path)?)
    }

    fn decode_bytes(&self, bytes: &[u8], _extension: Option<&str>) -> Result<DecodedAudio> {
        Self::read(WavReader::new(Cursor::new(bytes))?)
    }
}

/// Multi-format decoder (WAV, MP3, FLAC, Ogg Vorbis) backed by Symphonia.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    fn read(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<DecodedAudio> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
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
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .filter(|&rate| rate > 0)
            .ok_or(DecodeError::UnknownSampleRate)?;

        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder.decode(&packet)?;

            let buf = sample_buf.get_or_insert_with(|| {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                SampleBuffer::new(decoded.capacity() as u64, spec)
            });

            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }

        if channels == 0 {
            return Err(DecodeError::InvalidChannels(channels).into());
        }

        tracing::debug!(
            frames = samples.len() / channels as usize,
            sample_rate,
            channels,
            "decoded audio"
        );

        Ok(DecodedAudio::new(samples, sample_rate, channels))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode_file(&self, path: &Path) -> Result<DecodedAudio> {
        let file = std::fs::File::open(path)?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        Self::read(Box::new(file), extension)
    }

    fn decode_bytes(&self, bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio> {
        Self::read(Box::new(Cursor::new(bytes.to_vec())), extension)
    }
}

/// Average interleaved channels into mono.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidChannels`] for zero channels.
pub fn downmix(samples: Vec<f32>, channels: u16) -> Result<Vec<f32>> {
    match channels {
        0 => Err(DecodeError::InvalidChannels(channels).into()),
        1 => Ok(samples),
        n => Ok(samples
            .chunks_exact(n as usize)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect()),
    }
}

/// Drop everything past `duration` seconds at the given rate.
///
/// Keeps one extra sample so resampling still has data for the last output
/// sample; length normalization trims the rest.
pub fn truncate(mut samples: Vec<f32>, sample_rate: u32, duration: f32) -> Vec<f32> {
    let keep = (sample_rate as f64 * duration as f64).ceil() as usize + 1;
    samples.truncate(keep);
    samples
}

/// Input frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Resample mono audio with band-limited sinc interpolation.
///
/// Returns the input unchanged when the rates already match. Otherwise the
/// output holds exactly `ceil(len * to / from)` samples; the resampler is
/// flushed after the last chunk so the tail held back by the sinc filter is
/// not lost.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownSampleRate`] for a zero rate and
/// [`DecodeError::Resample`] if rubato rejects the conversion.
pub fn resample(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>> {
    if from == 0 || to == 0 {
        return Err(DecodeError::UnknownSampleRate.into());
    }

    if from == to || samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to as f64 / from as f64;
    let num_frames = samples.len();
    let expected = (num_frames as f64 * ratio).ceil() as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut resampled = Vec::with_capacity(expected + resampler.output_frames_max());
    let mut input = samples.as_slice();

    while input.len() >= resampler.input_frames_next() {
        let (chunk, rest) = input.split_at(resampler.input_frames_next());
        let output = resampler
            .process(&[chunk], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        resampled.extend(output.into_iter().flatten());
        input = rest;
    }

    if !input.is_empty() {
        let output = resampler
            .process_partial(Some([input].as_slice()), None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        resampled.extend(output.into_iter().flatten());
    }

    // the last `sinc_len / 2` input frames only come out on flush
    while resampled.len() < expected {
        let output = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        let before = resampled.len();
        resampled.extend(output.into_iter().flatten());
        if resampled.len() == before {
            break;
        }
    }

    resampled.truncate(expected);

    tracing::debug!(
        from,
        to,
        input = num_frames,
        output = resampled.len(),
        "resampled audio"
    );

    Ok(resampled)
}
