//! Update run: reuse the saved document, optionally re-ask some sections,
//! then re-apply.
use super::{deploy, finalize, persist, InstallOptions};
use crate::cluster::{self, ClusterHints};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::session::{Prompter, Session};
use crate::ui;
use crate::util;
use crate::values::ConfigStore;
use std::time::Instant;

pub fn run_update(
    options: &InstallOptions,
    runner: &dyn CommandRunner,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let started = Instant::now();
    ui::header("Laminar Data Plane - Update");

    let store = ConfigStore::new(options.paths.values_file());
    let loaded = store.load()?;
    ui::success(&format!(
        "Loaded configuration from {}",
        util::display_path(store.path(), None)
    ));

    let context = cluster::current_context(runner)?;
    ui::success(&format!("Using kubectl context: {context}"));
    store.ensure_writable()?;

    let needs_prompts = !options.reconfigure.is_empty() || loaded.config.validate().is_err();
    let hints = if needs_prompts {
        ClusterHints::discover(runner, Some(context))
    } else {
        ClusterHints {
            context: Some(context),
            ..ClusterHints::default()
        }
    };
    let outcome = Session::update(prompter, &hints, &loaded, &options.reconfigure).run()?;
    let config = finalize(runner, outcome)?;
    persist(&store, options, &config, Some(&loaded))?;
    deploy(runner, options, &config, started)
}
