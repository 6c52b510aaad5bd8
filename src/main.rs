mod accounts;
mod cli;
mod error;
mod models;
mod qif;
mod rules;
mod session;
mod settings;
mod store;
mod suggest;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RulesCommands};
use session::SessionStatus;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QIFTAG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tag {
            file,
            output,
            audit,
            batch,
            dry_run,
        } => cli::tag::run(cli.config, file, output, audit, batch, dry_run)
            .map(|status| status == SessionStatus::Completed),
        Commands::Accounts {
            csv,
            field,
            delimiter,
            dry_run,
        } => cli::accounts::run(cli.config, &csv, field, delimiter, dry_run).map(|_| true),
        Commands::Rules { command } => match command {
            RulesCommands::List => cli::rules::list(cli.config).map(|_| true),
        },
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {e}", "Error:".red());
            std::process::exit(1);
        }
    }
}
