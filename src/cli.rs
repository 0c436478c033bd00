//! Command-line arguments.
use crate::chart::RELEASE_NAME;
use crate::session::Section;
use crate::values::InstallPaths;
use crate::workflow::{InstallOptions, ReadinessPolicy};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "laminar-install",
    version,
    about = "Install or update the Laminar data plane on Kubernetes",
    after_help = "Examples:\n  laminar-install                          Interactive installation\n  laminar-install --update-only            Re-apply the saved laminar.yaml\n  laminar-install -u --reconfigure storage Change storage settings, then re-apply"
)]
pub struct Cli {
    /// Skip the interactive setup and re-apply the saved configuration
    #[arg(short = 'u', long)]
    pub update_only: bool,

    /// Sections to ask again during an update (repeatable)
    #[arg(long, value_enum, value_name = "SECTION", requires = "update_only")]
    pub reconfigure: Vec<Section>,

    /// Helm chart directory
    #[arg(long, value_name = "DIR", env = "LAMINAR_CHART_DIR", default_value = ".")]
    pub chart_dir: PathBuf,

    /// Configuration document (defaults to <chart-dir>/laminar.yaml)
    #[arg(long, value_name = "PATH", env = "LAMINAR_VALUES_FILE")]
    pub values_file: Option<PathBuf>,

    /// Helm release name
    #[arg(long, default_value = RELEASE_NAME)]
    pub release: String,

    /// Seconds between load balancer polls
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Give up waiting for the load balancer after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub readiness_timeout_secs: u64,

    /// Deploy without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Emit debug logs to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            paths: InstallPaths::new(self.chart_dir.clone(), self.values_file.clone()),
            release: self.release.clone(),
            readiness: ReadinessPolicy {
                interval: Duration::from_secs(self.poll_interval_secs),
                timeout: Duration::from_secs(self.readiness_timeout_secs),
            },
            assume_yes: self.yes,
            reconfigure: self.reconfigure.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_resolve_values_file_in_chart_dir() {
        let cli = Cli::try_parse_from(["laminar-install", "--chart-dir", "charts/laminar"])
            .expect("parse");
        let options = cli.install_options();
        assert!(!cli.update_only);
        assert_eq!(
            options.paths.values_file(),
            Path::new("charts/laminar").join("laminar.yaml")
        );
        assert_eq!(options.release, "laminar-dataplane");
        assert_eq!(options.readiness, ReadinessPolicy::default());
    }

    #[test]
    fn reconfigure_requires_update_only() {
        assert!(Cli::try_parse_from(["laminar-install", "--reconfigure", "storage"]).is_err());
        let cli = Cli::try_parse_from([
            "laminar-install",
            "-u",
            "--reconfigure",
            "storage",
            "--reconfigure",
            "keys",
        ])
        .expect("parse");
        assert_eq!(cli.reconfigure, vec![Section::Storage, Section::Keys]);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(Cli::try_parse_from(["laminar-install", "-u", "--reconfigure", "dns"]).is_err());
    }
}
