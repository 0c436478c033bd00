//! `laminar-install`: interactive installer for the Laminar data plane.
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod chart;
mod cli;
mod cluster;
mod error;
mod exec;
mod provision;
mod session;
mod ui;
mod util;
mod values;
mod workflow;

use cli::Cli;
use error::Error;
use exec::SystemRunner;
use session::TermPrompter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "laminar_install=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> error::Result<()> {
    cluster::check_prerequisites()?;
    let options = cli.install_options();
    let runner = SystemRunner;
    let mut prompter = TermPrompter::new();
    if cli.update_only {
        workflow::run_update(&options, &runner, &mut prompter)
    } else {
        workflow::run_install(&options, &runner, &mut prompter)
    }
}

fn report(err: &Error) {
    if err.is_warning() {
        ui::warning(&err.to_string());
        ui::warning("The release was applied; check `kubectl get svc` for the address.");
        return;
    }
    if matches!(err, Error::Aborted) {
        ui::warning("Installation cancelled.");
        return;
    }
    let detail = match err {
        Error::Other(inner) => format!("{inner:#}"),
        _ => err.to_string(),
    };
    ui::error(&format!("{} failed: {detail}", err.phase()));
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code())
        }
    }
}
