//! Tracker Shell - process-supervising shell for the tracker backend
//!
//! Binary entry point: wires config, logging, the supervisor, and the
//! headless presentation surface together.

mod config;
mod runner;

use std::path::PathBuf;

use clap::Parser;

use tshell_core::prelude::*;
use tshell_supervisor::{Deployment, Supervisor, SupervisorConfig};

/// Tracker Shell - supervises the twitter_alert_tool backend
#[derive(Parser, Debug)]
#[command(name = "tshell")]
#[command(about = "Supervises the twitter_alert_tool backend", long_about = None)]
struct Args {
    /// Explicit path to the backend executable (overrides config and
    /// deployment resolution)
    #[arg(long, value_name = "PATH")]
    backend: Option<PathBuf>,

    /// Resolve the backend under a packaged resources root instead of the
    /// working directory
    #[arg(long, requires = "resources_root")]
    packaged: bool,

    /// Resources root of the packaged bundle
    #[arg(long, value_name = "PATH")]
    resources_root: Option<PathBuf>,

    /// Path to a config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tshell_core::logging::init().context("failed to initialize logging")?;

    let args = Args::parse();
    let settings = config::load(args.config.as_deref())?;

    let executable = resolve_backend(&args, &settings)?;
    info!("Supervising backend executable: {}", executable.display());

    let handle = Supervisor::spawn(SupervisorConfig::new(executable));
    runner::run(handle).await?;

    info!("Tracker Shell exiting");
    Ok(())
}

/// Pick the backend executable: explicit path (CLI, then config) wins;
/// otherwise resolve for the deployment the flags/config describe.
fn resolve_backend(args: &Args, settings: &config::Settings) -> Result<PathBuf> {
    if let Some(path) = args
        .backend
        .clone()
        .or_else(|| settings.backend.executable.clone())
    {
        return Ok(path);
    }

    let deployment = if args.packaged || settings.backend.packaged {
        let resources_root = args
            .resources_root
            .clone()
            .or_else(|| settings.backend.resources_root.clone())
            .ok_or_else(|| Error::config("packaged deployment requires a resources root"))?;
        Deployment::Packaged { resources_root }
    } else {
        Deployment::Development
    };

    tshell_supervisor::resolve::backend_executable(&deployment)
}
