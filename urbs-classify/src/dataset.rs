//! Offline feature generation over a labeled dataset directory.
//!
//! The dataset is laid out as `<root>/<label>/<clip>.<ext>`, one directory per
//! label. Features are extracted with the same [`FeatureExtractor`] used for
//! serving, so training and inference see identical tensors.

use crate::audio::{self, AudioDecoder};
use crate::error::{ConfigError, Error, Result};
use crate::features::{FeatureExtractor, FeatureTensor};
use crate::labels::Labels;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Audio file with its class assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetEntry {
    pub path: PathBuf,
    pub label_index: usize,
}

/// Extracted features for one dataset clip.
#[derive(Clone, Debug)]
pub struct LabeledFeatures {
    pub path: PathBuf,
    pub label: String,
    pub label_index: usize,
    pub features: FeatureTensor,
}

/// Result of a dataset pass.
#[derive(Debug, Default)]
pub struct Dataset {
    /// Successfully extracted clips, in scan order
    pub items: Vec<LabeledFeatures>,
    /// Clips that failed to decode or extract
    pub failures: Vec<(PathBuf, Error)>,
}

/// List supported audio files under `<root>/<label>/` for every label.
///
/// Files are sorted by path within each label so the scan order is stable.
/// Label directories that do not exist are skipped.
pub fn scan(root: &Path, labels: &Labels) -> Result<Vec<DatasetEntry>> {
    let mut entries = Vec::new();

    for (label_index, label) in labels.iter().enumerate() {
        let dir = root.join(label);

        if !dir.is_dir() {
            tracing::warn!(label, dir = ?dir.display(), "label directory missing, skipping");
            continue;
        }

        let read_err = |source: std::io::Error| ConfigError::Read {
            path: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() && audio::is_supported(&path) {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!(label, count = files.len(), "scanned label directory");

        entries.extend(
            files
                .into_iter()
                .map(|path| DatasetEntry { path, label_index }),
        );
    }

    Ok(entries)
}

/// Extract features for every entry in parallel.
///
/// Per-file failures are collected rather than aborting the run.
pub fn extract(
    entries: &[DatasetEntry],
    labels: &Labels,
    extractor: &FeatureExtractor,
    decoder: &dyn AudioDecoder,
) -> Dataset {
    let results: Vec<(PathBuf, Result<LabeledFeatures>)> = entries
        .par_iter()
        .map(|entry| {
            let result = extractor
                .extract_file(&entry.path, decoder)
                .map(|features| LabeledFeatures {
                    path: entry.path.clone(),
                    label: labels
                        .get(entry.label_index)
                        .unwrap_or_default()
                        .to_string(),
                    label_index: entry.label_index,
                    features,
                });
            (entry.path.clone(), result)
        })
        .collect();

    let mut dataset = Dataset::default();
    for (path, result) in results {
        match result {
            Ok(item) => dataset.items.push(item),
            Err(e) => {
                tracing::warn!(path = ?path.display(), error = %e, "failed to extract features");
                dataset.failures.push((path, e));
            }
        }
    }

    tracing::info!(
        extracted = dataset.items.len(),
        failed = dataset.failures.len(),
        "dataset features extracted"
    );

    dataset
}

/// Scan `root` and extract features for every clip found.
pub fn load(
    root: &Path,
    labels: &Labels,
    extractor: &FeatureExtractor,
    decoder: &dyn AudioDecoder,
) -> Result<Dataset> {
    let entries = scan(root, labels)?;
    Ok(extract(&entries, labels, extractor, decoder))
}
