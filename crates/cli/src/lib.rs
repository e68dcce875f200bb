pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tendero",
    about = "Tendero operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations, and review orders.",
    after_help = "Examples:\n  tendero doctor --json\n  tendero config\n  tendero orders --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM credentials, catalog source, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the most recently persisted orders as JSON")]
    Orders {
        #[arg(long, default_value_t = commands::orders::DEFAULT_LIMIT)]
        limit: u32,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Orders { limit } => commands::orders::run(limit),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
