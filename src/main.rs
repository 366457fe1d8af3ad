mod cli;
mod commands;
mod config;
mod progress;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Config;
use std::io;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ionos-converge", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context { quiet: cli.quiet };
    let config = Config::load(cli.config.as_deref())?;
    let connection = &cli.connection;

    match cli.command {
        Command::Datacenter(args) => commands::reconcile::datacenter(&ctx, &config, connection, args),
        Command::Lan(args) => commands::reconcile::lan(&ctx, &config, connection, args),
        Command::Nodepool(args) => commands::reconcile::nodepool(&ctx, &config, connection, args),
        Command::Info(args) => commands::info::run(&config, connection, args),
        Command::Completions { .. } => Ok(()),
    }
}
