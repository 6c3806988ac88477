//! Extract subcommand - offline feature generation for a labeled dataset.
//!
//! Output is JSON lines: the feature contract first, then one record per clip.

use eyre::{Result, WrapErr};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use urbs_classify::audio::SymphoniaDecoder;
use urbs_classify::config::{FeatureConfig, FeatureContract};
use urbs_classify::dataset::{self, LabeledFeatures};
use urbs_classify::features::FeatureExtractor;
use urbs_classify::labels::Labels;

/// CLI arguments for dataset feature extraction.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Dataset root containing one directory per label
    pub root: PathBuf,

    /// Output JSON lines path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Label list file, one label per line (default: UrbanSound8K classes)
    #[arg(short, long)]
    pub labels: Option<PathBuf>,

    #[command(flatten)]
    pub feature_config: FeatureConfig,
}

/// Resolved configuration for dataset feature extraction.
#[derive(Debug)]
pub struct Config {
    pub root: PathBuf,
    pub output: PathBuf,
    pub labels: Labels,
    pub extractor: FeatureExtractor,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let labels = match args.labels {
            Some(path) => Labels::from_file(&path)
                .wrap_err_with(|| format!("failed to load labels: {:?}", path.display()))?,
            None => Labels::default(),
        };

        let extractor =
            FeatureExtractor::new(args.feature_config).wrap_err("invalid feature settings")?;

        Ok(Self {
            root: args.root,
            output: args.output,
            labels,
            extractor,
        })
    }
}

/// One JSON line per extracted clip.
#[derive(Debug, Serialize)]
pub struct Record<'a> {
    pub path: &'a Path,
    pub label: &'a str,
    pub label_index: usize,
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl<'a> From<&'a LabeledFeatures> for Record<'a> {
    fn from(item: &'a LabeledFeatures) -> Self {
        let (n_mels, n_frames, channels) = item.features.dim();

        Self {
            path: &item.path,
            label: &item.label,
            label_index: item.label_index,
            shape: [n_mels, n_frames, channels],
            data: item.features.iter().copied().collect(),
        }
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        root = ?config.root.display(),
        output = ?config.output.display(),
        "extracting dataset features"
    );

    let s = Instant::now();

    let dataset = dataset::load(
        &config.root,
        &config.labels,
        &config.extractor,
        &SymphoniaDecoder,
    )
    .wrap_err_with(|| format!("failed to scan dataset: {:?}", config.root.display()))?;

    let d = s.elapsed();
    tracing::info!(duration = %format!("{:.2}s", d.as_secs_f32()), "extraction completed");

    let contract = FeatureContract::new(*config.extractor.config());
    write_jsonl(&config.output, &contract, &dataset.items)
        .wrap_err_with(|| format!("failed to write features: {:?}", config.output.display()))?;

    for (path, e) in &dataset.failures {
        eprintln!("skipped {}: {e}", path.display());
    }

    println!(
        "{} clips written to {} ({} skipped)",
        dataset.items.len(),
        config.output.display(),
        dataset.failures.len()
    );

    Ok(())
}

fn write_jsonl(path: &Path, contract: &FeatureContract, items: &[LabeledFeatures]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    serde_json::to_writer(&mut writer, contract)?;
    writeln!(writer)?;

    for item in items {
        serde_json::to_writer(&mut writer, &Record::from(item))?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn writes_contract_then_records() {
        let path = std::env::temp_dir().join("urbs_extract_records.jsonl");
        let contract = FeatureContract::new(FeatureConfig::URBAN_SOUND);
        let items = vec![LabeledFeatures {
            path: PathBuf::from("siren/a.wav"),
            label: "siren".to_string(),
            label_index: 8,
            features: Array3::from_elem((2, 2, 1), 0.5),
        }];

        write_jsonl(&path, &contract, &items).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed = FeatureContract::from_json(lines[0]).unwrap();
        assert_eq!(parsed, contract);

        let record: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record["label"], "siren");
        assert_eq!(record["label_index"], 8);
        assert_eq!(record["shape"], serde_json::json!([2, 2, 1]));
        assert_eq!(record["data"].as_array().unwrap().len(), 4);

        std::fs::remove_file(path).ok();
    }
}
