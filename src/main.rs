mod app;
mod async_compare;
mod backend;
mod cli;
mod compare;
mod config;
mod session;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::Cli;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "ghsync=debug",
        _ => "ghsync=trace",
    };
    let filter =
        EnvFilter::try_from_env("GHSYNC_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load config, apply CLI overrides
    let config_path = config::config_path();
    let mut config = config::load_config(&config_path);
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    let mut app = App::new(&config, config_path)?;
    app.override_selection(cli.repo, cli.branch);

    if let Err(e) = app.run(cli.command).await {
        eprintln!("ghsync: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
