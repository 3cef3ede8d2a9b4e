//! fzcomp - fuzzy completion for line-editing shells
//!
//! # Usage
//!
//! ```bash
//! # zsh
//! source <(fzcomp init zsh)
//!
//! # bash
//! eval "$(fzcomp init bash)"
//!
//! # built-in shell
//! fzcomp shell
//! ```

use std::io::IsTerminal;

use clap::Parser;
use tracing::Level;

use fzcomp::cli::{CliArgs, CliInterface, WidgetStatus};
use fzcomp::error::Result;
use fzcomp::repl::ShellEngine;

/// Application entry point
fn main() {
    let args = CliArgs::parse();
    let is_widget = args.is_widget();

    // A shell script calling a widget expects status 5 for configuration errors
    let cli = match CliInterface::from_args(args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("fzcomp: {}", e);
            let code = if is_widget && e.is_config() {
                WidgetStatus::ConfigError.code()
            } else {
                1
            };
            std::process::exit(code);
        }
    };

    initialize_logging(&cli);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Main application logic
///
/// 1. Handle subcommands
/// 2. Otherwise start the built-in shell
///
/// # Returns
/// * `Result<i32>` - Process exit status
fn run(cli: &CliInterface) -> Result<i32> {
    if let Some(code) = cli.handle_subcommand()? {
        return Ok(code);
    }

    let cwd = std::env::current_dir()?;
    let color = std::io::stdout().is_terminal();
    let mut shell = ShellEngine::new(cli.config(), cwd, color)?;
    shell.run()?;

    Ok(0)
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr; stdout carries widget replies and candidates.
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let level: Level = cli.config().logging.level.to_tracing_level();

    // Build subscriber with level filter
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    // Configure timestamps
    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
