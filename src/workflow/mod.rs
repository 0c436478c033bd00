//! Install and update orchestration.
//!
//! Both flows end in the same deploy step: apply the chart, wait for pods,
//! then poll the load balancer. The values document is persisted before any
//! cluster mutation.
mod helm;
mod install;
mod readiness;
mod update;

pub use helm::{apply_release, Release};
pub use install::run_install;
pub use readiness::{wait_for_address, wait_for_pods, ReadinessPolicy};
pub use update::run_update;

use crate::chart;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::provision::{provisioner_for, ProvisionRequest};
use crate::session::{Section, SessionOutcome};
use crate::ui;
use crate::util;
use crate::values::{ConfigStore, Configuration, InstallPaths, LoadedDocument, PersistOutcome};
use std::time::Instant;
use tracing::{debug, info};

/// Fields whose origin is worth a log line when diagnosing a run.
const PROVENANCE_FIELDS: [&str; 4] = [
    "namespace",
    "cloud.region",
    "clickhouse.s3.useEnvironmentCredentials",
    "dataPlaneProxy.loadBalancer.port",
];

/// Run-wide settings resolved from the command line.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub paths: InstallPaths,
    pub release: String,
    pub readiness: ReadinessPolicy,
    /// Skip the deploy confirmation.
    pub assume_yes: bool,
    /// Sections to re-ask in update mode.
    pub reconfigure: Vec<Section>,
}

/// Run provisioning when requested, fold the resulting credentials into the
/// configuration and check the final document.
fn finalize(runner: &dyn CommandRunner, outcome: SessionOutcome) -> Result<Configuration> {
    debug!(asked = ?outcome.asked, provision = outcome.provision, "session confirmed");
    for field in PROVENANCE_FIELDS {
        debug!(field, provenance = %outcome.layers.provenance(field), "resolved");
    }
    let mut config = outcome.config;
    if outcome.provision {
        let provisioner = provisioner_for(&config, runner);
        ui::section(&format!(
            "Provisioning object storage ({})",
            provisioner.provider().label()
        ));
        let credentials = provisioner.provision(&ProvisionRequest::from_config(&config))?;
        credentials.apply_to(&mut config.clickhouse.s3);
        if !credentials.bucket.is_empty() {
            ui::success(&format!("Bucket ready: {}", credentials.bucket));
        }
    }
    if let Err(errors) = config.validate() {
        let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(Error::Invalid(joined.join("; ")));
    }
    Ok(config)
}

fn persist(
    store: &ConfigStore,
    options: &InstallOptions,
    config: &Configuration,
    previous: Option<&LoadedDocument>,
) -> Result<()> {
    let shown = util::display_path(store.path(), None);
    match store.persist(config, previous)? {
        PersistOutcome::Written => ui::success(&format!("Configuration saved to {shown}")),
        PersistOutcome::Unchanged => ui::info(&format!("Configuration unchanged ({shown})")),
    }
    info!(release = %options.release, "configuration persisted");
    Ok(())
}

/// Apply the chart and wait for the deployment to come up.
fn deploy(
    runner: &dyn CommandRunner,
    options: &InstallOptions,
    config: &Configuration,
    started: Instant,
) -> Result<()> {
    ui::section("Deploying Laminar Data Plane");
    let release = Release::new(&options.release, &options.paths, config);
    apply_release(runner, &release, config, options.paths.values_dir())?;
    ui::success(&format!("Helm release {} applied", options.release));

    let deadline = options.readiness.deadline();
    wait_for_pods(runner, &config.namespace, deadline);
    let lb = &config.data_plane_proxy.load_balancer;
    if lb.enabled {
        let service = chart::load_balancer_service();
        let remaining = options.readiness.until(deadline);
        let address = wait_for_address(runner, &config.namespace, &service, &remaining)?;
        ui::final_url(&address, lb.port);
    } else {
        ui::info("LoadBalancer disabled; reach the proxy through the cluster network.");
    }
    ui::info(&format!("Total time: {}", ui::format_elapsed(started.elapsed())));
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
