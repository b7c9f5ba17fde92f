use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use evt_core::SystemClock;
use tracing_subscriber::EnvFilter;

use evt_cli::commands::{Delivery, fire, run};
use evt_cli::{Cli, Commands, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries dry-run output, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let delivery = Delivery::from_config(&config, cli.dry_run, Arc::new(SystemClock))?;
    let tracker = delivery.tracker();
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Fire(args) => {
            fire::run(&mut stdout, &tracker, &delivery, args).await?;
        }
        Commands::Run(args) => {
            let code = run::run(&mut stdout, &tracker, &delivery, args).await?;
            if code != 0 {
                return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
