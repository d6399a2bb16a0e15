//! [`SchemaStore`] backed by a single JSON document on disk.
//!
//! The document is `{ "forms": [ ... ] }`. A bare top-level array of schemas,
//! the format older exports use, is also accepted on load. Writes go to a
//! sibling temporary file which then replaces the document, so readers never
//! observe a half-written file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use formwright_core::{FormSchema, SchemaStore};

use crate::config::StoreConfig;

/// Errors raised by [`JsonFileSchemaStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed form document {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode forms: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    forms: &'a [FormSchema],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentIn {
    Wrapped {
        #[serde(default)]
        forms: Vec<FormSchema>,
    },
    Bare(Vec<FormSchema>),
}

/// File-backed schema store.
#[derive(Debug, Clone)]
pub struct JsonFileSchemaStore {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileSchemaStore {
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            path: config.data_path.clone(),
            pretty: config.pretty,
        }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<FormSchema>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no form document yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let doc: DocumentIn = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })?;
        Ok(match doc {
            DocumentIn::Wrapped { forms } | DocumentIn::Bare(forms) => forms,
        })
    }

    fn write(&self, forms: &[FormSchema]) -> Result<(), StoreError> {
        let doc = DocumentOut { forms };
        let mut body = if self.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        body.push('\n');

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, body).map_err(write_err)?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        info!(path = %self.path.display(), count = forms.len(), "forms written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SchemaStore for JsonFileSchemaStore {
    fn load_all(&self) -> anyhow::Result<Vec<FormSchema>> {
        Ok(self.read()?)
    }

    fn save_all(&self, forms: &[FormSchema]) -> anyhow::Result<()> {
        Ok(self.write(forms)?)
    }
}
