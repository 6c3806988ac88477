//! Classify subcommand - rank the most likely sound classes of an audio file.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use color_eyre::Section;
use eyre::{Result, WrapErr};
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use urbs_classify::config::FeatureConfig;
use urbs_classify::error::{Error, ErrorKind};
use urbs_classify::labels::Labels;
use urbs_classify::pipeline::{DEFAULT_TOP_K, Prediction, SoundClassifier};

/// CLI arguments for classification.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to input audio file (wav, mp3, flac, ogg)
    pub path: PathBuf,

    #[command(flatten)]
    pub model_args: ModelArgs,

    /// Number of predictions to print
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Print predictions as JSON
    #[arg(long)]
    pub json: bool,

    /// Feature settings, overridden by `features.json` in the model directory
    #[command(flatten)]
    pub feature_config: FeatureConfig,
}

/// Resolved configuration for classification.
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub model: ModelConfig,
    pub top_k: usize,
    pub json: bool,
    pub feature_config: FeatureConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            path: args.path,
            model: args.model_args.try_into()?,
            top_k: args.top_k,
            json: args.json,
            feature_config: args.feature_config,
        })
    }
}

/// JSON report for one classified file.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub filename: String,
    pub predictions: Vec<ReportEntry<'a>>,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportEntry<'a> {
    pub label: &'a str,
    pub confidence: f32,
}

impl<'a> Report<'a> {
    pub fn new(filename: String, predictions: &'a [Prediction]) -> Self {
        Self {
            filename,
            predictions: predictions
                .iter()
                .map(|p| ReportEntry {
                    label: &p.label,
                    confidence: p.confidence,
                })
                .collect(),
            success: true,
        }
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(input = ?config.path.display(), "classifying audio");

    let s = Instant::now();

    let mut pipeline = SoundClassifier::from_repo(
        &config.model.repo,
        build_session()?,
        config.feature_config,
        Labels::default(),
    )
    .map_err(|e| {
        let unavailable = e
            .downcast_ref::<Error>()
            .is_some_and(|err| err.kind() == ErrorKind::ModelUnavailable);
        if unavailable {
            e.suggestion("pass a model directory containing model.onnx with --model")
        } else {
            e
        }
    })?;

    let d = s.elapsed();
    tracing::info!(duration = %format_secs(d.as_secs_f32()), "model loaded");

    let s = Instant::now();

    let predictions = pipeline
        .classify_file(&config.path, config.top_k)
        .wrap_err_with(|| format!("failed to classify: {:?}", config.path.display()))?;

    let d = s.elapsed();
    tracing::info!(duration = %format_secs(d.as_secs_f32()), "inference completed");

    if config.json {
        let filename = config
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{}",
            serde_json::to_string_pretty(&Report::new(filename, &predictions))?
        );
    } else {
        print!("{}", format_predictions(&predictions));
    }

    Ok(())
}

/// Build a session builder with execution providers configured by Cargo features.
///
/// Providers are tried in priority order; CPU is always available as fallback.
///
/// # Execution Providers
///
/// Enabled via Cargo features:
/// - `cuda` - NVIDIA CUDA
/// - `tensorrt` - NVIDIA TensorRT
/// - `openvino` - Intel OpenVINO
/// - `directml` - DirectML (Windows)
/// - `coreml` - CoreML (macOS)
fn build_session() -> Result<SessionBuilder> {
    let builder = Session::builder()?.with_execution_providers([
        #[cfg(feature = "cuda")]
        CUDAExecutionProvider::default().build(),
        #[cfg(feature = "tensorrt")]
        TensorRTExecutionProvider::default().build(),
        #[cfg(feature = "openvino")]
        OpenVINOExecutionProvider::default()
            .with_device_type("HETERO:GPU,CPU")
            .with_cache_dir(".cache/ort")
            .build(),
        #[cfg(feature = "directml")]
        DirectMLExecutionProvider::default().build(),
        #[cfg(feature = "coreml")]
        CoreMLExecutionProvider::default().build(),
    ])?;

    Ok(builder)
}

/// Render predictions as an aligned, ranked list.
fn format_predictions(predictions: &[Prediction]) -> String {
    let width = predictions
        .iter()
        .map(|p| p.label.len())
        .max()
        .unwrap_or(0);

    predictions
        .iter()
        .enumerate()
        .map(|(rank, p)| {
            format!(
                "{}. {:<width$}  {:.4}\n",
                rank + 1,
                p.label,
                p.confidence
            )
        })
        .collect()
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}
