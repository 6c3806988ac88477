//! urbs-classify: Urban sound classification from log-mel spectrograms.
//!
//! This crate turns an audio clip into a fixed-shape, normalized log-mel
//! tensor and ranks a classifier's scores over a fixed label set. The same
//! extractor serves offline dataset generation and online requests, so both
//! paths produce bit-identical features for the same input.
//!
//! # Architecture
//!
//! - [`features::FeatureExtractor`]: audio samples → `(n_mels, n_frames, 1)` tensor
//! - [`classifier::Classifier`]: feature tensor → raw score vector
//! - [`rank::top_k`]: score vector → deterministic top-K list
//! - [`pipeline::SoundClassifier`]: decode, extract, score and resolve labels
//!
//! Audio decoding sits behind [`audio::AudioDecoder`] with WAV (hound) and
//! multi-format (Symphonia) backends.
//!
//! # Quick Start
//!
//! ```ignore
//! use urbs_classify::config::FeatureConfig;
//! use urbs_classify::labels::Labels;
//! use urbs_classify::pipeline::SoundClassifier;
//! use urbs_classify::types::ModelRepo;
//! use ort::session::Session;
//!
//! let repo = ModelRepo::Path("model_dir".into());
//! let mut pipeline = SoundClassifier::from_repo(
//!     &repo,
//!     Session::builder()?,
//!     FeatureConfig::default(),
//!     Labels::default(),
//! )?;
//!
//! for p in pipeline.classify_file("siren.wav".as_ref(), 3)? {
//!     println!("{}: {:.3}", p.label, p.confidence);
//! }
//! ```

pub mod audio;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod labels;
pub mod mel;
pub mod pipeline;
pub mod rank;
pub mod types;
