pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "lapak",
    about = "Lapak storefront assistant CLI",
    long_about = "Drive the Lapak buyer session from a terminal: interactive chat, \
                  catalog fixtures, and configuration inspection.",
    after_help = "Examples:\n  lapak chat\n  lapak chat --locale id\n  lapak seed > products.json\n  lapak config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Interactive buyer chat backed by the in-memory store")]
    Chat {
        #[arg(long, help = "Path to lapak.toml")]
        config: Option<PathBuf>,
        #[arg(long, help = "Display language: en or id")]
        locale: Option<String>,
    },
    #[command(about = "Emit the built-in sample catalog as JSON fixtures")]
    Seed,
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config {
        #[arg(long, help = "Path to lapak.toml")]
        config: Option<PathBuf>,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { config, locale } => commands::chat::run(config, locale).await,
        Command::Seed => commands::seed::run(),
        Command::Config { config } => commands::config::run(config),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
