//! Fresh installation: interactive session, provisioning, persist, deploy.
use super::{deploy, finalize, persist, InstallOptions};
use crate::cluster::{self, ClusterHints};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::session::{Prompter, Session};
use crate::ui;
use crate::util;
use crate::values::{ConfigStore, Configuration, LoadedDocument};
use std::time::Instant;
use tracing::warn;

pub fn run_install(
    options: &InstallOptions,
    runner: &dyn CommandRunner,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let started = Instant::now();
    ui::header("Laminar Data Plane - Installation");
    ui::info("This installer configures and deploys the Laminar data plane into your cluster.");

    let context = cluster::current_context(runner)?;
    ui::success(&format!("Using kubectl context: {context}"));

    let store = ConfigStore::new(options.paths.values_file());
    let previous = load_previous(&store)?;
    store.ensure_writable()?;

    let hints = ClusterHints::discover(runner, Some(context));
    let outcome = Session::fresh(&mut *prompter, &hints, previous.as_ref()).run()?;
    let config = finalize(runner, outcome)?;
    persist(&store, options, &config, previous.as_ref())?;

    if !options.assume_yes && !confirm_deploy(prompter, options, &store, &config)? {
        ui::info(&format!(
            "Configuration is saved to {}. Run with --update-only to deploy it later.",
            util::display_path(store.path(), None)
        ));
        return Ok(());
    }
    deploy(runner, options, &config, started)
}

/// A previous document seeds the prompt defaults; an unreadable one is
/// reported and ignored.
fn load_previous(store: &ConfigStore) -> Result<Option<LoadedDocument>> {
    if !store.exists() {
        return Ok(None);
    }
    match store.load() {
        Ok(doc) => {
            ui::info(&format!(
                "Found existing configuration at {}; its values are offered as defaults.",
                util::display_path(store.path(), None)
            ));
            Ok(Some(doc))
        }
        Err(err @ Error::InvalidDocument { .. }) => {
            warn!(error = %err, "ignoring unreadable configuration");
            ui::warning(&format!("{err}; starting from defaults"));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn confirm_deploy(
    prompter: &mut dyn Prompter,
    options: &InstallOptions,
    store: &ConfigStore,
    config: &Configuration,
) -> Result<bool> {
    prompter.section("Ready to Deploy");
    let mut summary = vec![
        format!("Release:     {}", options.release),
        format!("Namespace:   {}", config.namespace),
        format!("Values file: {}", util::display_path(store.path(), None)),
    ];
    if config.clickhouse.s3.enabled {
        summary.push(format!("Bucket:      {}", config.clickhouse.s3.bucket));
    }
    for line in &summary {
        prompter.note(crate::session::Tone::Info, line);
    }
    Ok(prompter.confirm("Deploy now?", true)?)
}
