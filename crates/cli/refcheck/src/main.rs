//! Reference safety checker CLI
//!
//! Checks lowered programs for references that a resizing call may leave
//! dangling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod check;
mod config;
mod paths;
mod program;

#[derive(Parser)]
#[command(name = "refcheck")]
#[command(about = "Reference path and aliasing checks", long_about = None)]
#[command(version)]
struct Cli {
    /// Log path building decisions at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every method of a program
    Check {
        /// Program document (JSON)
        program: PathBuf,

        /// Configuration file
        #[arg(long, default_value = "refcheck.toml")]
        config: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the reference paths built for one method
    Paths {
        /// Program document (JSON)
        program: PathBuf,

        /// Method name or signature
        #[arg(long)]
        method: String,

        /// Configuration file
        #[arg(long, default_value = "refcheck.toml")]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            program,
            config,
            format,
        } => {
            let config = config::Config::load_or_default(&config)?;
            let failed = check::run_check(&program, &config, &format)?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::Paths {
            program,
            method,
            config,
        } => {
            let config = config::Config::load_or_default(&config)?;
            paths::print_paths(&program, &config, &method)?;
        }
    }

    Ok(())
}
