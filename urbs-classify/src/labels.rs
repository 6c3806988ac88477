//! Ordered class label list.

use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use std::path::Path;

/// The ten UrbanSound8K classes in class-index order.
pub const URBAN_SOUND_8K: [&str; 10] = [
    "air_conditioner",
    "car_horn",
    "children_playing",
    "dog_bark",
    "drilling",
    "engine_idling",
    "gun_shot",
    "jackhammer",
    "siren",
    "street_music",
];

/// Fixed, non-empty list of unique class labels.
///
/// Index `i` of a classifier's score vector corresponds to label `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Labels {
    /// Default file name inside a model directory.
    pub const FILE_NAME: &'static str = "labels.txt";

    /// Build a label list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyLabels`] or [`ConfigError::DuplicateLabel`].
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(ConfigError::EmptyLabels.into());
        }

        let mut seen = HashSet::with_capacity(labels.len());
        if let Some(dup) = labels.iter().find(|label| !seen.insert(label.as_str())) {
            return Err(ConfigError::DuplicateLabel(dup.clone()).into());
        }

        Ok(Self(labels))
    }

    /// UrbanSound8K label list.
    pub fn urban_sound_8k() -> Self {
        Self(URBAN_SOUND_8K.iter().map(|s| s.to_string()).collect())
    }

    /// Parse one label per line; surrounding whitespace and blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    /// Load labels from a text file with one label per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Class index of a label name.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::urban_sound_8k()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn urban_sound_order() {
        let labels = Labels::urban_sound_8k();

        assert_eq!(labels.len(), 10);
        assert_eq!(labels.get(0), Some("air_conditioner"));
        assert_eq!(labels.get(3), Some("dog_bark"));
        assert_eq!(labels.get(9), Some("street_music"));
        assert_eq!(labels.get(10), None);
        assert_eq!(labels.index_of("siren"), Some(8));
    }

    #[test]
    fn parses_lines() {
        let labels = Labels::parse("siren\n\n  dog_bark \r\ncar_horn\n").unwrap();

        assert_eq!(
            labels.iter().collect::<Vec<_>>(),
            vec!["siren", "dog_bark", "car_horn"]
        );
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Labels::parse("\n \n"),
            Err(Error::Config(ConfigError::EmptyLabels))
        ));
    }

    #[test]
    fn rejects_duplicates() {
        assert!(matches!(
            Labels::new(["siren", "dog_bark", "siren"]),
            Err(Error::Config(ConfigError::DuplicateLabel(dup))) if dup == "siren"
        ));
    }

    #[test]
    fn reads_file() {
        let path = std::env::temp_dir().join("urbs_labels_test.txt");
        std::fs::write(&path, URBAN_SOUND_8K.join("\n")).unwrap();

        let labels = Labels::from_file(&path).unwrap();
        assert_eq!(labels, Labels::urban_sound_8k());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_config_error() {
        let path = std::env::temp_dir().join("urbs_labels_missing.txt");

        assert!(matches!(
            Labels::from_file(&path),
            Err(Error::Config(ConfigError::Read { .. }))
        ));
    }
}
