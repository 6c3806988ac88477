//! End-to-end classification: audio → features → scores → ranked labels.

use crate::audio::{AudioDecoder, SymphoniaDecoder};
use crate::classifier::{Classifier, OnnxClassifier};
use crate::config::{FeatureConfig, FeatureContract};
use crate::error::{ModelError, RequestError, Result};
use crate::features::{FeatureExtractor, FeatureTensor};
use crate::labels::Labels;
use crate::rank::{RankedScore, top_k};
use crate::types::ModelRepo;
use eyre::{Result as EyreResult, WrapErr};
use ort::session::builder::SessionBuilder;
use serde::Serialize;
use std::path::Path;

/// Default number of predictions returned.
pub const DEFAULT_TOP_K: usize = 3;

/// Ranked score resolved to its label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// Class index into the label list
    pub index: usize,
    /// Human-readable class label
    pub label: String,
    /// Raw classifier score
    pub confidence: f32,
}

/// Resolve ranked class indices to label strings.
///
/// Indices outside the label list are skipped; the ranker only produces
/// indices below the score vector length, which the pipeline checks against
/// the label count.
pub fn resolve(ranked: &[RankedScore], labels: &Labels) -> Vec<Prediction> {
    ranked
        .iter()
        .filter_map(|r| {
            labels.get(r.index).map(|label| Prediction {
                index: r.index,
                label: label.to_string(),
                confidence: r.score,
            })
        })
        .collect()
}

/// Sound classification pipeline.
///
/// Owns the feature extractor, label list and (once loaded) the classifier.
/// A pipeline without a classifier still validates requests and extracts
/// features, but fails inference with [`ModelError::Unavailable`].
pub struct SoundClassifier<C> {
    extractor: FeatureExtractor,
    labels: Labels,
    classifier: Option<C>,
    decoder: Box<dyn AudioDecoder>,
}

impl<C: Classifier> SoundClassifier<C> {
    /// Create a pipeline without a classifier.
    pub fn new(config: FeatureConfig, labels: Labels) -> Result<Self> {
        Ok(Self {
            extractor: FeatureExtractor::new(config)?,
            labels,
            classifier: None,
            decoder: Box::new(SymphoniaDecoder),
        })
    }

    pub fn with_classifier(mut self, classifier: C) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_decoder(mut self, decoder: impl AudioDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Install or replace the classifier.
    pub fn set_classifier(&mut self, classifier: C) {
        self.classifier = Some(classifier);
    }

    /// Whether a classifier is loaded.
    pub fn is_ready(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Classify mono samples at the configured sample rate.
    pub fn classify_samples(&mut self, audio: &[f32], k: usize) -> Result<Vec<Prediction>> {
        self.check_top_k(k)?;
        let features = self.extractor.extract(audio)?;
        self.rank(&features, k)
    }

    /// Decode and classify an audio file.
    pub fn classify_file(&mut self, path: &Path, k: usize) -> Result<Vec<Prediction>> {
        self.check_top_k(k)?;
        let features = self.extractor.extract_file(path, self.decoder.as_ref())?;
        self.rank(&features, k)
    }

    /// Decode and classify an in-memory audio file.
    pub fn classify_bytes(
        &mut self,
        bytes: &[u8],
        extension: Option<&str>,
        k: usize,
    ) -> Result<Vec<Prediction>> {
        self.check_top_k(k)?;
        let features = self
            .extractor
            .extract_bytes(bytes, extension, self.decoder.as_ref())?;
        self.rank(&features, k)
    }

    /// Score a prepared feature tensor and rank the result.
    pub fn rank(&mut self, features: &FeatureTensor, k: usize) -> Result<Vec<Prediction>> {
        let classifier = self.classifier.as_mut().ok_or(ModelError::Unavailable)?;
        let scores = classifier.infer(features)?;

        if scores.len() != self.labels.len() {
            return Err(ModelError::ScoreLength {
                expected: self.labels.len(),
                got: scores.len(),
            }
            .into());
        }

        let ranked = top_k(&scores, k)?;
        Ok(resolve(&ranked, &self.labels))
    }

    fn check_top_k(&self, k: usize) -> Result<()> {
        let n = self.labels.len();
        if k == 0 || k > n {
            return Err(RequestError::TopKOutOfRange { k, n }.into());
        }
        Ok(())
    }
}

impl SoundClassifier<OnnxClassifier> {
    /// Load a pipeline from a model repository.
    ///
    /// The repository must contain an ONNX model; `features.json` and
    /// `labels.txt` override `config` and `labels` when present so inference
    /// uses the contract the model was trained with. Failing to look them up
    /// (as opposed to their absence) is an error.
    pub fn from_repo(
        repo: &ModelRepo,
        session_builder: SessionBuilder,
        config: FeatureConfig,
        labels: Labels,
    ) -> EyreResult<Self> {
        let config = match repo.resolve_optional(FeatureContract::FILE_NAME)? {
            Some(path) => FeatureContract::from_file(&path)
                .wrap_err_with(|| format!("invalid feature contract: {:?}", path.display()))?
                .config,
            None => config,
        };

        let labels = match repo.resolve_optional(Labels::FILE_NAME)? {
            Some(path) => Labels::from_file(&path)
                .wrap_err_with(|| format!("invalid label list: {:?}", path.display()))?,
            None => labels,
        };

        let classifier = OnnxClassifier::from_repo(repo, session_builder)?;

        tracing::info!(
            n_labels = labels.len(),
            shape = ?config.feature_shape(),
            "classifier loaded"
        );

        Ok(Self::new(config, labels)?.with_classifier(classifier))
    }
}
