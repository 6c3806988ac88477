//! Features subcommand - dump the feature tensor of one audio file.

use eyre::{Result, WrapErr};
use serde::Serialize;
use std::path::PathBuf;
use urbs_classify::audio::SymphoniaDecoder;
use urbs_classify::config::{FeatureConfig, FeatureContract};
use urbs_classify::features::{FeatureExtractor, FeatureTensor};

/// CLI arguments for feature extraction.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to input audio file (wav, mp3, flac, ogg)
    pub path: PathBuf,

    /// Output JSON path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub feature_config: FeatureConfig,
}

/// Resolved configuration for feature extraction.
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub extractor: FeatureExtractor,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let extractor =
            FeatureExtractor::new(args.feature_config).wrap_err("invalid feature settings")?;

        Ok(Self {
            path: args.path,
            output: args.output,
            extractor,
        })
    }
}

/// Serialized feature tensor with the contract that produced it.
#[derive(Debug, Serialize)]
pub struct FeatureDump {
    pub contract: FeatureContract,
    pub shape: [usize; 3],
    /// Row-major `(n_mels, n_frames, 1)` values
    pub data: Vec<f32>,
}

impl FeatureDump {
    pub fn new(config: FeatureConfig, features: &FeatureTensor) -> Self {
        let (n_mels, n_frames, channels) = features.dim();

        Self {
            contract: config.into(),
            shape: [n_mels, n_frames, channels],
            data: features.iter().copied().collect(),
        }
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(input = ?config.path.display(), "extracting features");

    let features = config
        .extractor
        .extract_file(&config.path, &SymphoniaDecoder)
        .wrap_err_with(|| format!("failed to extract features: {:?}", config.path.display()))?;

    let dump = FeatureDump::new(*config.extractor.config(), &features);
    let json = serde_json::to_string(&dump)?;

    match config.output {
        Some(output) => {
            tracing::info!(path = ?output.display(), shape = ?dump.shape, "write features");
            std::fs::write(&output, json)
                .wrap_err_with(|| format!("failed to write features: {:?}", output.display()))?;
        }
        None => println!("{json}"),
    }

    Ok(())
}
