//! Mel-scaled power spectrogram and decibel conversion.

use crate::config::{FeatureConfig, MelScale};
use crate::error::Result;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Power floor before taking logarithms.
pub const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest bin, in decibels.
pub const TOP_DB: f32 = 80.0;

/// Mel-spectrogram analyzer.
///
/// Holds the window, FFT plan and filterbank for one configuration so
/// repeated calls only pay for the transform itself. Immutable after
/// construction and safe to share between threads.
#[derive(Clone)]
pub struct MelSpectrogram {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    filterbank: Array2<f32>,
}

impl std::fmt::Debug for MelSpectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MelSpectrogram")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .field("n_mels", &self.filterbank.nrows())
            .finish_non_exhaustive()
    }
}

impl MelSpectrogram {
    /// Build an analyzer for an already validated configuration.
    pub fn new(config: &FeatureConfig) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);

        Self {
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            window: hann_window(config.n_fft),
            fft,
            filterbank: mel_filterbank(
                config.n_fft,
                config.n_mels,
                config.sample_rate,
                config.mel_scale,
            ),
        }
    }

    /// Compute the mel power spectrogram.
    ///
    /// # Returns
    ///
    /// 2D array of non-negative mel band powers (n_mels, n_frames)
    pub fn apply(&self, audio: &[f32]) -> Array2<f32> {
        let spectrogram = self.stft_power(audio);
        self.filterbank.dot(&spectrogram)
    }

    /// Mel filterbank weights (n_mels, n_fft / 2 + 1).
    pub fn filterbank(&self) -> &Array2<f32> {
        &self.filterbank
    }

    /// Centered STFT power spectrogram (freq_bins, n_frames).
    ///
    /// The signal is zero-padded by `n_fft / 2` on both sides so frame `t`
    /// is centered on sample `t * hop_length`.
    fn stft_power(&self, audio: &[f32]) -> Array2<f32> {
        let pad = self.n_fft / 2;
        let padded_len = audio.len() + 2 * pad;
        let num_frames = padded_len.saturating_sub(self.n_fft) / self.hop_length + 1;
        let freq_bins = self.n_fft / 2 + 1;
        let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

        let mut frame = vec![Complex::new(0.0, 0.0); self.n_fft];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_length;

            for (i, slot) in frame.iter_mut().enumerate() {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|j| audio.get(j))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut frame);

            for (k, bin) in frame.iter().take(freq_bins).enumerate() {
                spectrogram[[k, frame_idx]] = bin.norm_sqr();
            }
        }

        spectrogram
    }
}

/// Convert a power spectrogram to decibels relative to its maximum.
///
/// Computes `10 * log10(max(AMIN, S) / max(AMIN, max(S)))` and floors the
/// result at `TOP_DB` below the peak, so every value lies in `[-TOP_DB, 0]`.
///
/// # Errors
///
/// Returns an error if the spectrogram is empty or contains NaN.
pub fn power_to_db(power: &Array2<f32>) -> Result<Array2<f32>> {
    let reference = *power.max()?;
    let ref_db = 10.0 * reference.max(AMIN).log10();

    let db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let max_db = *db.max()?;

    Ok(db.mapv(|d| d.max(max_db - TOP_DB)))
}

/// Periodic Hann window (DFT-even), matching `scipy.signal.get_window("hann", n)`.
fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| (0.5 - 0.5 * ((2.0 * PI * i as f64) / window_length as f64).cos()) as f32)
        .collect()
}

/// Convert frequency in Hz to mel scale.
fn hz_to_mel(freq: f64, scale: MelScale) -> f64 {
    match scale {
        MelScale::Htk => 2595.0 * (1.0 + freq / 700.0).log10(),
        MelScale::Slaney => {
            let f_sp = 200.0 / 3.0;
            let min_log_hz = 1000.0;
            let min_log_mel = min_log_hz / f_sp;
            let logstep = 6.4_f64.ln() / 27.0;

            if freq >= min_log_hz {
                min_log_mel + (freq / min_log_hz).ln() / logstep
            } else {
                freq / f_sp
            }
        }
    }
}

/// Convert mel scale to frequency in Hz.
fn mel_to_hz(mel: f64, scale: MelScale) -> f64 {
    match scale {
        MelScale::Htk => 700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0),
        MelScale::Slaney => {
            let f_sp = 200.0 / 3.0;
            let min_log_hz = 1000.0;
            let min_log_mel = min_log_hz / f_sp;
            let logstep = 6.4_f64.ln() / 27.0;

            if mel >= min_log_mel {
                min_log_hz * (logstep * (mel - min_log_mel)).exp()
            } else {
                f_sp * mel
            }
        }
    }
}

/// Create triangular mel filterbank between 0 Hz and Nyquist.
///
/// Slaney filters are scaled to constant area (`2 / bandwidth`); HTK filters
/// keep a unit peak.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: u32, scale: MelScale) -> Array2<f32> {
    let freq_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((n_mels, freq_bins));

    let sample_rate = sample_rate as f64;
    let min_mel = hz_to_mel(0.0, scale);
    let max_mel = hz_to_mel(sample_rate / 2.0, scale);

    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| {
            mel_to_hz(
                min_mel + (max_mel - min_mel) * i as f64 / (n_mels + 1) as f64,
                scale,
            )
        })
        .collect();

    let freq_bin_width = sample_rate / n_fft as f64;

    for mel_idx in 0..n_mels {
        let left = mel_points[mel_idx];
        let center = mel_points[mel_idx + 1];
        let right = mel_points[mel_idx + 2];

        let norm = match scale {
            MelScale::Slaney => 2.0 / (right - left),
            MelScale::Htk => 1.0,
        };

        for freq_idx in 0..freq_bins {
            let freq = freq_idx as f64 * freq_bin_width;
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            let weight = lower.min(upper).max(0.0);

            filterbank[[mel_idx, freq_idx]] = (weight * norm) as f32;
        }
    }

    filterbank
}
