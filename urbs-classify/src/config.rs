//! Feature contract shared by offline feature generation and online inference.
//!
//! A trained classifier is only valid for tensors produced under the exact
//! configuration it was trained with. [`FeatureContract`] pairs that
//! configuration with a version number covering the fixed numeric policies
//! (decibel reference, framing, padding) that are not configurable.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_SAMPLE_RATE: u32 = 22050;
const DEFAULT_DURATION: f32 = 3.0;
const DEFAULT_N_MELS: usize = 128;
const DEFAULT_HOP_LENGTH: usize = 512;
const DEFAULT_N_FFT: usize = 2048;

/// Upper bound on clip length and FFT size, in samples.
///
/// About three hours at 22.05 kHz; keeps every derived buffer size and frame
/// count well inside `usize`.
pub const MAX_SAMPLES: usize = 1 << 28;

/// Mel-frequency scale used to place filterbank centers.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MelScale {
    /// Slaney scale (linear below 1 kHz, log above) with area-normalized filters
    #[default]
    Slaney,
    /// HTK scale `2595 * log10(1 + f / 700)` with unit-peak filters
    Htk,
}

/// Processing configuration for feature extraction.
#[derive(clap::Args, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Target sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Clip duration in seconds (longer clips are truncated, shorter ones padded)
    #[arg(long, default_value_t = DEFAULT_DURATION)]
    pub duration: f32,

    /// Number of mel bands
    #[arg(long, default_value_t = DEFAULT_N_MELS)]
    pub n_mels: usize,

    /// STFT hop length in samples
    #[arg(long, default_value_t = DEFAULT_HOP_LENGTH)]
    pub hop_length: usize,

    /// FFT size (and window length) in samples
    #[arg(long, default_value_t = DEFAULT_N_FFT)]
    pub n_fft: usize,

    /// Mel-frequency scale
    #[arg(long, value_enum, default_value_t = MelScale::Slaney)]
    #[serde(default)]
    pub mel_scale: MelScale,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::URBAN_SOUND
    }
}

impl FeatureConfig {
    /// UrbanSound8K configuration: 3 s at 22.05 kHz, 128 mel bands.
    pub const URBAN_SOUND: Self = Self {
        sample_rate: DEFAULT_SAMPLE_RATE,
        duration: DEFAULT_DURATION,
        n_mels: DEFAULT_N_MELS,
        hop_length: DEFAULT_HOP_LENGTH,
        n_fft: DEFAULT_N_FFT,
        mel_scale: MelScale::Slaney,
    };

    /// Check the parameter combination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any size is zero, the duration is not a
    /// positive finite number, the FFT is shorter than two samples, or the
    /// clip or FFT exceeds [`MAX_SAMPLES`].
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sample_rate", self.sample_rate as usize),
            ("n_mels", self.n_mels),
            ("hop_length", self.hop_length),
        ];

        if let Some(&(name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::NonPositive { name }.into());
        }

        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ConfigError::InvalidDuration(self.duration).into());
        }

        if self.n_fft < 2 {
            return Err(ConfigError::FftTooSmall(self.n_fft).into());
        }

        if self.n_fft > MAX_SAMPLES {
            return Err(ConfigError::TooLarge {
                name: "n_fft",
                max: MAX_SAMPLES,
            }
            .into());
        }

        // checked in f64 before the usize cast saturates
        if (self.sample_rate as f64 * self.duration as f64).round() > MAX_SAMPLES as f64 {
            return Err(ConfigError::TooLarge {
                name: "duration",
                max: MAX_SAMPLES,
            }
            .into());
        }

        if self.target_samples() == 0 {
            return Err(ConfigError::InvalidDuration(self.duration).into());
        }

        Ok(())
    }

    /// Exact number of samples every clip is normalized to.
    pub fn target_samples(&self) -> usize {
        (self.sample_rate as f64 * self.duration as f64).round() as usize
    }

    /// Number of frequency bins in the power spectrum.
    pub fn n_freqs(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of STFT frames produced for a length-normalized clip.
    ///
    /// Frames are centered, so the signal is padded by `n_fft / 2` on both
    /// sides and the count only depends on the hop length.
    pub fn n_frames(&self) -> usize {
        let pad = self.n_fft / 2;
        self.target_samples()
            .saturating_add(2 * pad)
            .saturating_sub(self.n_fft)
            / self.hop_length.max(1)
            + 1
    }

    /// Shape `(n_mels, n_frames, 1)` of every tensor under this configuration.
    pub fn feature_shape(&self) -> (usize, usize, usize) {
        (self.n_mels, self.n_frames(), 1)
    }

    /// Convert a frame index to its center time in seconds.
    pub fn frame_to_secs(&self, frame: usize) -> f32 {
        (frame * self.hop_length) as f32 / self.sample_rate as f32
    }
}

/// Versioned feature configuration persisted alongside models and datasets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureContract {
    pub version: u32,
    pub config: FeatureConfig,
}

impl FeatureContract {
    /// Current contract version.
    ///
    /// Version 1: decibels referenced to the spectrogram maximum with an 80 dB
    /// floor, centered periodic-Hann frames, zero padding, global
    /// mean/variance normalization.
    pub const VERSION: u32 = 1;

    /// Default file name inside a model directory.
    pub const FILE_NAME: &'static str = "features.json";

    pub fn new(config: FeatureConfig) -> Self {
        Self {
            version: Self::VERSION,
            config,
        }
    }

    /// Parse and validate a contract from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let contract: Self = serde_json::from_str(json).map_err(ConfigError::Contract)?;
        contract.check()?;
        Ok(contract)
    }

    /// Load and validate a contract file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Serialize the contract as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(ConfigError::Contract)?)
    }

    fn check(&self) -> Result<()> {
        if self.version != Self::VERSION {
            return Err(ConfigError::ContractVersion {
                expected: Self::VERSION,
                found: self.version,
            }
            .into());
        }
        self.config.validate()
    }
}

impl From<FeatureConfig> for FeatureContract {
    fn from(config: FeatureConfig) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};

    #[test]
    fn urban_sound_shape() {
        let config = FeatureConfig::URBAN_SOUND;

        assert_eq!(config.target_samples(), 66150);
        assert_eq!(config.n_freqs(), 1025);
        assert_eq!(config.feature_shape(), (128, 130, 1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn frame_count_is_independent_of_fft_size() {
        let small = FeatureConfig {
            n_fft: 512,
            ..FeatureConfig::URBAN_SOUND
        };

        assert_eq!(small.n_frames(), FeatureConfig::URBAN_SOUND.n_frames());
    }

    #[test]
    fn odd_fft_size_frames() {
        let config = FeatureConfig {
            sample_rate: 100,
            duration: 1.0,
            n_fft: 5,
            hop_length: 10,
            ..FeatureConfig::URBAN_SOUND
        };

        // 100 + 2*2 - 5 = 99 → 9 hops + 1
        assert_eq!(config.n_frames(), 10);
    }

    #[test]
    fn rejects_zero_hop_length() {
        let config = FeatureConfig {
            hop_length: 0,
            ..FeatureConfig::URBAN_SOUND
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            err,
            Error::Config(ConfigError::NonPositive { name: "hop_length" })
        ));
    }

    #[test]
    fn rejects_bad_duration() {
        for duration in [0.0, -1.0, f32::NAN, f32::INFINITY, 1e-9] {
            let config = FeatureConfig {
                duration,
                ..FeatureConfig::URBAN_SOUND
            };
            assert!(config.validate().is_err(), "accepted duration {duration}");
        }
    }

    #[test]
    fn rejects_oversized_clip() {
        for duration in [1e30, f32::MAX, 20_000.0] {
            let config = FeatureConfig {
                duration,
                ..FeatureConfig::URBAN_SOUND
            };

            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(matches!(
                err,
                Error::Config(ConfigError::TooLarge {
                    name: "duration",
                    max: MAX_SAMPLES
                })
            ));
        }

        let config = FeatureConfig {
            n_fft: usize::MAX,
            ..FeatureConfig::URBAN_SOUND
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::TooLarge { name: "n_fft", .. }))
        ));
    }

    #[test]
    fn frame_count_saturates_instead_of_overflowing() {
        let config = FeatureConfig {
            duration: 1e30,
            n_fft: usize::MAX,
            ..FeatureConfig::URBAN_SOUND
        };

        // unvalidated configs must not panic in the size helpers
        assert_eq!(config.target_samples(), usize::MAX);
        assert!(config.n_frames() > 0);
    }

    #[test]
    fn longest_clip_is_accepted() {
        let config = FeatureConfig {
            sample_rate: 1 << 14,
            duration: (1 << 14) as f32,
            ..FeatureConfig::URBAN_SOUND
        };

        assert_eq!(config.target_samples(), MAX_SAMPLES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_tiny_fft() {
        let config = FeatureConfig {
            n_fft: 1,
            ..FeatureConfig::URBAN_SOUND
        };

        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::FftTooSmall(1)))
        ));
    }

    #[test]
    fn contract_json_roundtrip() {
        let contract = FeatureContract::new(FeatureConfig::URBAN_SOUND);
        let json = contract.to_json().unwrap();

        assert!(json.contains("\"mel_scale\": \"slaney\""));
        assert_eq!(FeatureContract::from_json(&json).unwrap(), contract);
    }

    #[test]
    fn contract_rejects_other_version() {
        let json = r#"{
            "version": 7,
            "config": {
                "sample_rate": 22050,
                "duration": 3.0,
                "n_mels": 128,
                "hop_length": 512,
                "n_fft": 2048
            }
        }"#;

        assert!(matches!(
            FeatureContract::from_json(json),
            Err(Error::Config(ConfigError::ContractVersion {
                expected: 1,
                found: 7
            }))
        ));
    }

    #[test]
    fn contract_rejects_invalid_config() {
        let json = r#"{
            "version": 1,
            "config": {
                "sample_rate": 22050,
                "duration": 3.0,
                "n_mels": 128,
                "hop_length": 0,
                "n_fft": 2048
            }
        }"#;

        let err = FeatureContract::from_json(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn contract_rejects_oversized_duration() {
        let json = r#"{
            "version": 1,
            "config": {
                "sample_rate": 22050,
                "duration": 1e30,
                "n_mels": 128,
                "hop_length": 512,
                "n_fft": 2048
            }
        }"#;

        let err = FeatureContract::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::TooLarge {
                name: "duration",
                ..
            })
        ));
    }
}
