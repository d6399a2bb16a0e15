//! Runtime configuration for the store layer.

use std::path::PathBuf;

/// Default location of the JSON document holding saved forms.
pub const DEFAULT_DATA_FILE: &str = "formwright-forms.json";

/// Store-level configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the JSON document the file store reads and writes.
    pub data_path: PathBuf,
    /// Whether the file store pretty-prints its output.
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            pretty: true,
        }
    }
}

impl StoreConfig {
    /// Configuration for a given data file, other settings at their defaults.
    #[must_use]
    pub fn at(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Self::default()
        }
    }
}
