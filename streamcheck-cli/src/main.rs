//! Main entry point for the `StreamCheck` CLI.

use std::{path::Path, process::ExitCode};

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;

mod commands;
mod lines;
mod tracer;

use commands::check::CheckArgs;

/// StreamCheck CLI
#[derive(Parser)]
#[command(name = "streamcheck", version)]
#[command(
    about = "Smoke test for streaming chat endpoints",
    long_about = "Smoke test for streaming chat endpoints. Without a subcommand, runs `check` with default settings and exits 0 on success, 1 on failure."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands for the StreamCheck CLI
#[derive(Subcommand)]
enum Commands {
    /// Send one chat request and verify the streamed response
    Check(CheckArgs),

    /// Generate a configuration file with the default settings
    Config {
        /// Format of the configuration file to generate (yaml or json). Defaults to yaml.
        #[arg(
            long,
            short,
            help = "Format of the configuration file to generate (yaml or json). Defaults to yaml."
        )]
        format: Option<String>,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(
            long,
            short,
            help = "The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)"
        )]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        None => run_check(&CheckArgs::default()).await,
        Some(Commands::Check(args)) => run_check(&args).await,
        Some(Commands::Config { format }) => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            match commands::config::generate_config(&format, Path::new(".")) {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("Error: {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Completion { shell }) => {
            commands::completion::generate_completion(shell);
            ExitCode::SUCCESS
        }
    }
}

async fn run_check(args: &CheckArgs) -> ExitCode {
    let outcome = commands::check::handle_check(args).await;
    ExitCode::from(outcome.exit_code())
}
