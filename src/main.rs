// src/main.rs

mod cli;
mod commands;

use alpaca::Config;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Log filter for the given verbosity; `RUST_LOG` wins when set
fn log_filter(debug: bool, verbose: bool) -> EnvFilter {
    let level = if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn stderr_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish()
}

/// Load the configuration and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::discover().context("Failed to load configuration")?,
    };

    if cli.debug {
        config.general.debug = true;
    }
    if cli.verbose {
        config.general.verbose = true;
    }
    if cli.quiet {
        config.general.suppress_build_output = true;
    }

    Ok(config)
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Some(Commands::Install {
            package,
            build,
            options,
        }) => commands::cmd_install(&config, &package, build, &options),
        Some(Commands::Info { package, options }) => commands::cmd_info(&config, &package, &options),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config discovery logs too, before the final verbosity is known
    let loaded = tracing::subscriber::with_default(
        stderr_subscriber(log_filter(cli.debug, cli.verbose)),
        || load_config(&cli),
    );

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::subscriber::with_default(stderr_subscriber(log_filter(false, false)), || {
                error!("An error occurred: {:#}", e)
            });
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(config.general.debug, config.general.verbose))
        .init();

    debug!("This software is provided under GNU GPL v3.0");
    debug!("This software comes with ABSOLUTELY NO WARRANTY");

    if let Err(e) = run(cli, config) {
        error!("An error occurred: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
