//! Thane CLI - load scenarios and talk to the rules engine.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Thane - a headless hex-strategy rules engine
#[derive(Parser, Debug)]
#[command(name = "thane")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Diagnostics level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a GML scenario file and print the tree
    Parse {
        /// Scenario file
        #[arg(required = true)]
        file: std::path::PathBuf,

        /// Skip the preprocessor pass
        #[arg(long)]
        raw: bool,
    },

    /// Start an engine from an init script and read Lua from stdin
    Repl {
        /// Init script (Lua)
        #[arg(required = true)]
        script: std::path::PathBuf,
    },

    /// Load an init script, then execute a file of Lua lines
    Run {
        /// Init script (Lua)
        #[arg(required = true)]
        script: std::path::PathBuf,

        /// File of Lua fragments, one per line
        #[arg(short, long)]
        commands: Option<std::path::PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let result = match args.command {
        Commands::Parse { file, raw } => cli::parse::execute(file, raw),
        Commands::Repl { script } => cli::repl::execute(script),
        Commands::Run {
            script,
            commands,
            format,
        } => cli::run::execute(script, commands, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
