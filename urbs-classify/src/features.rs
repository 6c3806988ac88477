//! Audio-to-feature transformation.
//!
//! Every clip goes through the same steps, whether features are generated
//! offline for training or online for a single request:
//!
//! 1. Length normalization to exactly `sample_rate * duration` samples
//! 2. Centered STFT and mel filterbank (power)
//! 3. Decibel conversion referenced to the spectrogram maximum
//! 4. Global mean/variance normalization
//! 5. Trailing channel axis

use crate::audio::{self, AudioDecoder, DecodedAudio};
use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};
use crate::mel::{MelSpectrogram, power_to_db};
use ndarray::{Array2, Array3, Axis};
use std::path::Path;

/// Normalized log-mel tensor of shape `(n_mels, n_frames, 1)`.
pub type FeatureTensor = Array3<f32>;

/// Deterministic feature extractor for one [`FeatureConfig`].
#[derive(Clone, Debug)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    mel: MelSpectrogram,
}

impl FeatureExtractor {
    /// Validate the configuration and precompute the analysis state.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid parameter combinations.
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            mel: MelSpectrogram::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Truncate or zero-pad to the configured number of samples.
    pub fn normalize_length(&self, audio: &[f32]) -> Vec<f32> {
        normalize_length(audio, self.config.target_samples())
    }

    /// Extract features from mono samples already at the configured rate.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::DegenerateSignal`] if the spectrogram has zero variance
    /// - [`FeatureError::MinMax`] if the samples contain NaN
    pub fn extract(&self, audio: &[f32]) -> Result<FeatureTensor> {
        let audio = self.normalize_length(audio);

        let power = self.mel.apply(&audio);
        let db = power_to_db(&power)?;
        let features = standardize(db)?;

        tracing::debug!(
            n_mels = features.nrows(),
            n_frames = features.ncols(),
            "extracted features"
        );

        Ok(features.insert_axis(Axis(2)))
    }

    /// Downmix, trim and resample decoded audio, then extract features.
    pub fn extract_decoded(&self, decoded: DecodedAudio) -> Result<FeatureTensor> {
        let source_rate = decoded.sample_rate;
        let mono = decoded.into_mono()?;
        let mono = audio::truncate(mono, source_rate, self.config.duration);
        let mono = audio::resample(mono, source_rate, self.config.sample_rate)?;

        self.extract(&mono)
    }

    /// Decode an audio file and extract features.
    pub fn extract_file(&self, path: &Path, decoder: &dyn AudioDecoder) -> Result<FeatureTensor> {
        self.extract_decoded(decoder.decode_file(path)?)
    }

    /// Decode an in-memory audio file and extract features.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
        decoder: &dyn AudioDecoder,
    ) -> Result<FeatureTensor> {
        self.extract_decoded(decoder.decode_bytes(bytes, extension)?)
    }
}

/// Truncate `audio` to at most `target` samples, zero-padding the tail if shorter.
pub fn normalize_length(audio: &[f32], target: usize) -> Vec<f32> {
    let mut normalized = audio[..audio.len().min(target)].to_vec();
    normalized.resize(target, 0.0);
    normalized
}

/// Subtract the global mean and divide by the global standard deviation.
fn standardize(mut db: Array2<f32>) -> Result<Array2<f32>> {
    let mean = db.mean().ok_or(FeatureError::DegenerateSignal)?;
    let std = db.std(0.0);

    if !std.is_finite() || std <= 0.0 {
        return Err(FeatureError::DegenerateSignal.into());
    }

    db.mapv_inplace(|x| (x - mean) / std);
    Ok(db)
}
