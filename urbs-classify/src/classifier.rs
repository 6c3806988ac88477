//! Classifier capability and its ONNX Runtime implementation.

use crate::error::{Error, ModelError, Result};
use crate::features::FeatureTensor;
use crate::types::ModelRepo;
use eyre::{Result as EyreResult, WrapErr};
use ndarray::Axis;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::{inputs, value::Tensor};
use std::path::Path;

/// Raw per-class scores, index-aligned with the label list.
pub type ScoreVector = Vec<f32>;

/// Trained model that scores a feature tensor.
///
/// Takes `&mut self` because ONNX Runtime's `Session::run` requires it.
/// Callers sharing one classifier across threads serialize access themselves.
pub trait Classifier {
    /// Score one feature tensor of shape `(n_mels, n_frames, 1)`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the model rejects the input or fails.
    fn infer(&mut self, features: &FeatureTensor) -> Result<ScoreVector>;
}

impl<F> Classifier for F
where
    F: FnMut(&FeatureTensor) -> Result<ScoreVector>,
{
    fn infer(&mut self, features: &FeatureTensor) -> Result<ScoreVector> {
        self(features)
    }
}

/// Classifier backed by an ONNX model with input `(batch, n_mels, n_frames, 1)`.
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
}

impl OnnxClassifier {
    /// Model file names tried in priority order.
    pub const MODEL_FILES: &'static [&'static str] =
        &["model.onnx", "classifier.onnx", "model.int8.onnx"];

    /// Wrap a loaded session, feeding its first declared input.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingSignature`] if the model declares no
    /// inputs or no outputs.
    pub fn new(session: Session) -> Result<Self> {
        if session.outputs.is_empty() {
            return Err(ModelError::MissingSignature("outputs").into());
        }

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(ModelError::MissingSignature("inputs"))?;

        Ok(Self {
            session,
            input_name,
        })
    }

    /// Load a model file with the given session configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Load`] if ONNX Runtime rejects the file.
    pub fn from_file<P: AsRef<Path>>(path: P, session_builder: SessionBuilder) -> Result<Self> {
        let path = path.as_ref();
        let session = session_builder
            .commit_from_file(path)
            .map_err(|source| ModelError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(session)
    }

    /// Load the classifier from a model repository.
    ///
    /// # Arguments
    ///
    /// * `repo` - Model repository (local path, HF cache, or HF API)
    /// * `session_builder` - ONNX session builder for configuring execution providers
    pub fn from_repo(repo: &ModelRepo, session_builder: SessionBuilder) -> EyreResult<Self> {
        let model_path = repo
            .resolve_any(Self::MODEL_FILES)
            .map_err(|_| Error::from(ModelError::NotFound(Self::MODEL_FILES.join(", "))))?;

        tracing::debug!(path = ?model_path.display(), "loading classifier");

        Self::from_file(&model_path, session_builder)
            .wrap_err_with(|| format!("failed to load classifier: {:?}", model_path.display()))
    }

    /// Name of the model input fed with features.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&mut self, features: &FeatureTensor) -> Result<ScoreVector> {
        let batch = features.view().insert_axis(Axis(0)).to_owned();
        let input = Tensor::from_array(batch)?;

        let outputs = self
            .session
            .run(inputs![self.input_name.as_str() => input])?;

        let (name, scores) = outputs
            .iter()
            .next()
            .ok_or_else(|| ModelError::MissingOutput {
                name: "scores".to_string(),
            })?;

        let scores = scores.try_extract_array::<f32>()?;

        tracing::trace!(output = name, len = scores.len(), "classifier scores");

        Ok(scores.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndarray::Array3;

    /// Single `Flatten` node: scores are the features in row-major order.
    const FLATTEN_MODEL: &[u8] = include_bytes!("../tests/fixtures/flatten.onnx");

    fn model_dir(name: &str, model: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("model.onnx"), model).unwrap();
        dir
    }

    #[test]
    fn closures_are_classifiers() {
        let mut calls = 0;
        let mut classifier = |features: &FeatureTensor| -> Result<ScoreVector> {
            calls += 1;
            Ok(vec![features.len() as f32, 0.0])
        };

        let features = Array3::<f32>::zeros((4, 3, 1));
        let scores = classifier.infer(&features).unwrap();

        assert_eq!(scores, vec![12.0, 0.0]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn closure_errors_propagate() {
        let mut classifier =
            |_: &FeatureTensor| -> Result<ScoreVector> { Err(ModelError::Unavailable.into()) };

        let err = classifier
            .infer(&Array3::<f32>::zeros((1, 1, 1)))
            .unwrap_err();

        assert!(matches!(err, Error::Model(ModelError::Unavailable)));
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn missing_model_is_unavailable() {
        let dir = std::env::temp_dir().join("urbs_classifier_empty_repo");
        std::fs::create_dir_all(&dir).unwrap();

        let builder = Session::builder().unwrap();
        let result = OnnxClassifier::from_repo(&ModelRepo::Path(dir.clone()), builder);

        let report = result.err().expect("empty repo must fail");
        let err = report.downcast_ref::<Error>().expect("typed error");
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn onnx_scores_follow_feature_order() {
        let dir = model_dir("urbs_classifier_flatten", FLATTEN_MODEL);

        let mut classifier =
            OnnxClassifier::from_file(dir.join("model.onnx"), Session::builder().unwrap()).unwrap();
        assert_eq!(classifier.input_name(), "features");

        let features =
            Array3::from_shape_vec((2, 3, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let scores = classifier.infer(&features).unwrap();

        // batch axis added for the model, dropped from the scores
        assert_eq!(scores, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn onnx_repo_loads_first_candidate() {
        let dir = model_dir("urbs_classifier_flatten_repo", FLATTEN_MODEL);

        let mut classifier =
            OnnxClassifier::from_repo(&ModelRepo::Path(dir.clone()), Session::builder().unwrap())
                .unwrap();

        let scores = classifier.infer(&Array3::<f32>::ones((4, 5, 1))).unwrap();
        assert_eq!(scores.len(), 20);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn corrupt_model_is_configuration_error() {
        let dir = model_dir("urbs_classifier_corrupt", b"definitely not protobuf");

        let err = OnnxClassifier::from_file(dir.join("model.onnx"), Session::builder().unwrap())
            .err()
            .expect("corrupt model must fail");

        assert!(matches!(err, Error::Model(ModelError::Load { .. })));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.kind().is_retryable());

        let repo = ModelRepo::Path(dir.clone());
        let report = OnnxClassifier::from_repo(&repo, Session::builder().unwrap())
            .err()
            .expect("corrupt model must fail");
        let err = report.downcast_ref::<Error>().expect("typed error");
        assert_eq!(err.kind(), ErrorKind::Configuration);

        std::fs::remove_dir_all(dir).ok();
    }
}
