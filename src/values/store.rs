//! Durable storage of the configuration document.
//!
//! Writes go to a temp file in the target directory and are renamed into
//! place, so readers see either the old or the new document, never a mix.
use super::{Configuration, LayeredConfig};
use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DOCUMENT_HEADER: &str = "\
# Laminar data plane configuration, managed by laminar-install.
# Re-run with --update-only after editing.\n";

/// A document read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Raw bytes as found on disk.
    pub bytes: Vec<u8>,
    pub layers: LayeredConfig,
    pub config: Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// The effective configuration already matched the file; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn load(&self) -> Result<LoadedDocument> {
        let bytes = fs::read(&self.path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::ConfigNotFound {
                path: self.path.clone(),
            },
            _ => Error::persistence(&self.path, err),
        })?;
        let invalid = |source: serde_yaml::Error| Error::InvalidDocument {
            path: self.path.clone(),
            source,
        };
        let document: Value = serde_yaml::from_slice(&bytes).map_err(invalid)?;
        let document = match document {
            Value::Null => Value::Mapping(Mapping::new()),
            Value::Mapping(_) => document,
            // Re-parse as a mapping to get a descriptive error.
            _ => Value::Mapping(serde_yaml::from_slice::<Mapping>(&bytes).map_err(invalid)?),
        };
        let layers = LayeredConfig::from_user_document(document);
        let config = layers.effective().map_err(invalid)?;
        debug!(path = %self.path.display(), "loaded configuration document");
        Ok(LoadedDocument {
            bytes,
            layers,
            config,
        })
    }

    /// Fail early when the document cannot be written, before anything
    /// touches the cloud or the cluster.
    pub fn ensure_writable(&self) -> Result<()> {
        let dir = self.dir();
        let fail = |err: std::io::Error| Error::persistence(&self.path, err);
        let probe = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
        drop(probe);
        if self.path.exists() {
            let metadata = fs::metadata(&self.path).map_err(fail)?;
            if metadata.permissions().readonly() {
                return Err(Error::persistence(
                    &self.path,
                    std::io::Error::new(ErrorKind::PermissionDenied, "file is read-only"),
                ));
            }
        }
        Ok(())
    }

    /// Serialized form of a configuration as it would be written.
    pub fn render(config: &Configuration) -> Result<String> {
        let body = serde_yaml::to_string(config).map_err(|err| {
            Error::Other(anyhow::Error::new(err).context("serialize configuration"))
        })?;
        Ok(format!("{DOCUMENT_HEADER}{body}"))
    }

    /// Persist `config`, skipping the write when `previous` already holds the
    /// same effective configuration.
    pub fn persist(
        &self,
        config: &Configuration,
        previous: Option<&LoadedDocument>,
    ) -> Result<PersistOutcome> {
        let rendered = Self::render(config)?;
        if let Some(previous) = previous {
            if previous.bytes == rendered.as_bytes() || previous.config == *config {
                info!(path = %self.path.display(), "configuration unchanged, not rewriting");
                return Ok(PersistOutcome::Unchanged);
            }
        }
        self.write_atomic(rendered.as_bytes())?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(PersistOutcome::Written)
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let fail = |err: std::io::Error| Error::persistence(&self.path, err);
        // The document holds secrets; NamedTempFile creates it with mode 0600.
        let mut tmp = tempfile::NamedTempFile::new_in(self.dir()).map_err(fail)?;
        tmp.write_all(bytes).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(&self.path).map_err(|err| fail(err.error))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
