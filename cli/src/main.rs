mod cli;
mod commands;

use clap::Parser;
use fqa_core::config::Settings;
use fqa_core::error::AppError;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(code = %err.code, error = %err.message, "command failed");
        if let Some(details) = &err.details {
            error!(details = %details, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Index(args) => commands::index::run(&settings, args),
        Commands::Retrieve(args) => commands::retrieve::run(&settings, args),
        Commands::Tables(args) => commands::tables::run_tables(&settings, args),
        Commands::Sql(args) => commands::tables::run_sql(&settings, args),
        Commands::Ask(args) => commands::ask::run(&settings, args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
