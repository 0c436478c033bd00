//! Helm release apply.
//!
//! The chart receives the rendered values (provider annotations merged in),
//! written to a temp file next to the values document for the duration of
//! the call. The persisted document itself is never rewritten here.
use crate::chart;
use crate::error::{Error, Result};
use crate::exec::{argv, command_line, CommandRunner};
use crate::values::{Configuration, InstallPaths};
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Release coordinates for one apply.
#[derive(Debug, Clone)]
pub struct Release<'a> {
    pub name: &'a str,
    pub chart_dir: &'a Path,
    pub namespace: &'a str,
}

impl<'a> Release<'a> {
    pub fn new(name: &'a str, paths: &'a InstallPaths, config: &'a Configuration) -> Self {
        Self {
            name,
            chart_dir: paths.chart_dir(),
            namespace: &config.namespace,
        }
    }

    /// `helm upgrade --install` arguments for a values file.
    pub fn upgrade_args(&self, values_file: &Path) -> Vec<String> {
        let chart_dir = self.chart_dir.display().to_string();
        let values_file = values_file.display().to_string();
        argv(&[
            "upgrade",
            "--install",
            self.name,
            &chart_dir,
            "--namespace",
            self.namespace,
            "--create-namespace",
            "-f",
            &values_file,
        ])
    }
}

/// Install or upgrade the release; idempotent on the helm side.
pub fn apply_release(
    runner: &dyn CommandRunner,
    release: &Release<'_>,
    config: &Configuration,
    staging_dir: &Path,
) -> Result<()> {
    let rendered = chart::render_values_yaml(config).context("render chart values")?;
    let mut values = tempfile::Builder::new()
        .prefix(".laminar-values-")
        .suffix(".yaml")
        .tempfile_in(staging_dir)
        .with_context(|| format!("create temp values file in {}", staging_dir.display()))?;
    values
        .write_all(rendered.as_bytes())
        .and_then(|()| values.flush())
        .context("write temp values file")?;

    let args = release.upgrade_args(values.path());
    info!(command = %command_line("helm", &args), "applying release");
    let code = runner
        .run_streaming("helm", &args)
        .map_err(Error::ApplySpawn)?;
    if code != Some(0) {
        return Err(Error::Apply { code });
    }
    Ok(())
}
