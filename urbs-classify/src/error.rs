//! Error types for urbs-classify organized by processing stage.

use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Classification pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio decoding stage error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Feature extraction stage error
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Model inference stage error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Caller request error
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Invalid feature configuration or label list.
///
/// Fatal at startup; never expected per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter that must be positive was zero
    #[error("invalid {name}: must be greater than zero")]
    NonPositive { name: &'static str },

    /// Clip duration is not a positive finite number
    #[error("invalid duration: {0}s")]
    InvalidDuration(f32),

    /// FFT size too small for a spectrum
    #[error("invalid fft size: {0} (minimum 2)")]
    FftTooSmall(usize),

    /// Clip or window longer than the supported maximum
    #[error("invalid {name}: exceeds {max} samples")]
    TooLarge { name: &'static str, max: usize },

    /// Feature contract written by an incompatible version
    #[error("feature contract version {found} is not supported (expected {expected})")]
    ContractVersion { expected: u32, found: u32 },

    /// Feature contract file could not be parsed
    #[error("malformed feature contract: {0}")]
    Contract(#[from] serde_json::Error),

    /// Label list has no entries
    #[error("label list is empty")]
    EmptyLabels,

    /// Label list names a class twice
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// Configuration file could not be read
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Audio source could not be decoded or resampled.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Channel count is zero
    #[error("invalid channel count: {0}")]
    InvalidChannels(u16),

    /// Sample rate is zero or missing from the stream
    #[error("unknown sample rate")]
    UnknownSampleRate,

    /// Container holds no decodable audio track
    #[error("no audio track found")]
    NoAudioTrack,

    /// Sample format not supported by the WAV reader
    #[error("unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },

    /// Resampler construction or processing failed
    #[error("resampling failed: {0}")]
    Resample(String),

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),

    /// Compressed audio format error
    #[error(transparent)]
    Symphonia(#[from] symphonia::core::errors::Error),
}

/// Feature extraction failures on valid configuration.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Decibel spectrogram has zero variance (e.g. silence)
    #[error("degenerate signal: spectrogram has zero variance")]
    DegenerateSignal,

    /// Spectrogram contains no comparable values
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Classifier availability and inference errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No classifier has been loaded yet
    #[error("classifier is not loaded")]
    Unavailable,

    /// Model file not found in the repository
    #[error("model file not found: {0}")]
    NotFound(String),

    /// Model file exists but ONNX Runtime cannot load it
    #[error("failed to load model {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// Model declares no inputs or outputs
    #[error("model has no {0}")]
    MissingSignature(&'static str),

    /// Missing expected output tensor
    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    /// Score vector length does not match the label list
    #[error("classifier returned {got} scores for {expected} labels")]
    ScoreLength { expected: usize, got: usize },

    /// ONNX Runtime error
    #[error(transparent)]
    Ort(#[from] ort::Error),
}

/// Caller programming errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Requested list length outside `1..=n`
    #[error("top-k {k} out of range: must be between 1 and {n}")]
    TopKOutOfRange { k: usize, n: usize },
}

/// Error taxonomy callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable or corrupt audio
    Decode,
    /// Invalid parameter combination
    Configuration,
    /// Zero-variance input such as silence
    DegenerateSignal,
    /// Classifier not ready
    ModelUnavailable,
    /// Classifier rejected the tensor or failed internally
    Inference,
    /// Top-k out of bounds
    InvalidRequest,
}

impl ErrorKind {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ModelUnavailable | Self::Inference)
    }

    /// Whether the failure is caused by the caller's input.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::Decode | Self::DegenerateSignal | Self::InvalidRequest
        )
    }
}

impl Error {
    /// Classify this error into the public taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            // a corrupt or incompatible model will not load on retry
            Error::Model(ModelError::Load { .. }) => ErrorKind::Configuration,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Feature(FeatureError::DegenerateSignal) => ErrorKind::DegenerateSignal,
            // non-finite spectra come from non-finite samples
            Error::Feature(FeatureError::MinMax(_)) => ErrorKind::Decode,
            Error::Model(ModelError::Unavailable | ModelError::NotFound(_)) => {
                ErrorKind::ModelUnavailable
            }
            Error::Model(_) => ErrorKind::Inference,
            Error::Request(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Result type alias for urbs-classify operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → DecodeError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Decode(DecodeError::Hound(e))
    }
}

// std::io::Error → DecodeError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Decode(DecodeError::Io(e))
    }
}

// symphonia::Error → DecodeError → Error
impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Error::Decode(DecodeError::Symphonia(e))
    }
}

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// MinMaxError → FeatureError → Error
impl From<MinMaxError> for Error {
    fn from(e: MinMaxError) -> Self {
        Error::Feature(FeatureError::MinMax(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let degenerate: Error = FeatureError::DegenerateSignal.into();
        assert_eq!(degenerate.kind(), ErrorKind::DegenerateSignal);
        assert!(degenerate.kind().is_client_error());
        assert!(!degenerate.kind().is_retryable());

        let unavailable: Error = ModelError::Unavailable.into();
        assert_eq!(unavailable.kind(), ErrorKind::ModelUnavailable);
        assert!(unavailable.kind().is_retryable());

        let scores: Error = ModelError::ScoreLength {
            expected: 10,
            got: 3,
        }
        .into();
        assert_eq!(scores.kind(), ErrorKind::Inference);
        assert!(scores.kind().is_retryable());
        assert!(!scores.kind().is_client_error());

        let request: Error = RequestError::TopKOutOfRange { k: 11, n: 10 }.into();
        assert_eq!(request.kind(), ErrorKind::InvalidRequest);
        assert!(request.kind().is_client_error());

        let load: Error = ModelError::Load {
            path: PathBuf::from("model.onnx"),
            source: ort::Error::new("protobuf parsing failed"),
        }
        .into();
        assert_eq!(load.kind(), ErrorKind::Configuration);
        assert!(!load.kind().is_retryable());

        let config: Error = ConfigError::NonPositive { name: "hop_length" }.into();
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert!(!config.kind().is_retryable());
        assert!(!config.kind().is_client_error());
    }

    #[test]
    fn io_errors_are_decode_errors() {
        let e: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(e.kind(), ErrorKind::Decode);
    }

    #[test]
    fn messages_name_the_problem() {
        let e: Error = RequestError::TopKOutOfRange { k: 0, n: 10 }.into();
        assert_eq!(e.to_string(), "top-k 0 out of range: must be between 1 and 10");
    }
}
