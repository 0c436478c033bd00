//! Typed paths into the chart directory.
use super::VALUES_FILE_NAME;
use std::path::{Path, PathBuf};

/// Locations the installer reads and writes.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    chart_dir: PathBuf,
    values_file: PathBuf,
}

impl InstallPaths {
    /// Values file defaults to `<chart_dir>/laminar.yaml`.
    pub fn new(chart_dir: PathBuf, values_file: Option<PathBuf>) -> Self {
        let values_file = values_file.unwrap_or_else(|| chart_dir.join(VALUES_FILE_NAME));
        Self {
            chart_dir,
            values_file,
        }
    }

    pub fn chart_dir(&self) -> &Path {
        &self.chart_dir
    }

    /// The persisted configuration document.
    pub fn values_file(&self) -> &Path {
        &self.values_file
    }

    /// Directory the values file lives in; temp files are staged here so the
    /// final rename stays on one filesystem.
    pub fn values_dir(&self) -> &Path {
        self.values_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}
