//! CLI entry point for tracker-session.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracker_session::{ConsoleInteraction, Settings, run_session};

mod app;
mod cli;

use app::exit_handler::{self, ProcessExit};
use app::terminal;
use cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    terminal::init_tracing(args.default_log_level());
    debug!(?args, "CLI arguments parsed");

    match run(&args).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            error!(error = %err, "tracker-session failed");
            eprintln!("Error: {err:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args) -> Result<ProcessExit> {
    let settings = Settings::resolve(&args.overrides()).context("failed to load settings")?;
    info!(
        data_dir = %settings.paths.dir().display(),
        site = %settings.base_url,
        "tracker-session starting"
    );

    let mut console = ConsoleInteraction::new();
    let outcome = run_session(&settings, &mut console)
        .await
        .with_context(|| format!("session with {} failed", settings.base_url))?;

    let exit = exit_handler::determine_exit_outcome(&outcome);
    info!(?exit, "tracker-session finished");
    Ok(exit)
}
