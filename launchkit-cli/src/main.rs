//! launchkit - install and update a game client from GitHub releases.
//!
//! ```text
//! launchkit install [--tag v1.2.0] [--install-dir DIR] ...
//! launchkit status
//! launchkit config <init|get|set|list|path>
//! ```
//!
//! Settings come from `config.ini` in the user config directory; command-line
//! flags override them.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use launchkit::config::ConfigFile;
use launchkit::logging::{init_logging, parse_level, LogConfig, LoggingGuard};

use commands::config::ConfigCommands;
use commands::install::InstallArgs;
use commands::status::StatusArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "launchkit", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this configuration file instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download, verify and extract the configured release
    Install(InstallArgs),

    /// Show the installed client version
    Status(StatusArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    // Config commands must work even when the file is broken
    let loaded = commands::load_config(cli.config.as_deref());

    let _guard = match setup_logging(cli.verbose, loaded.as_ref().ok()) {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let result = match cli.command {
        Commands::Install(args) => loaded.and_then(|config| commands::install::run(args, &config)),
        Commands::Status(args) => loaded.and_then(|config| commands::status::run(args, &config)),
        Commands::Config(command) => commands::config::run(command, cli.config.as_deref()),
    };

    if let Err(e) = result {
        e.exit();
    }
}

/// Start logging from `-v` flags, falling back to the `[logging]` section.
fn setup_logging(verbose: u8, config: Option<&ConfigFile>) -> Result<LoggingGuard, CliError> {
    let mut log_config = LogConfig::from_verbosity(verbose);

    if let Some(config) = config {
        if verbose == 0 {
            if let Some(level) = config.logging.level.as_deref().and_then(parse_level) {
                log_config = log_config.with_level(level);
            }
        }
        log_config = log_config.with_log_file(config.logging.file.clone());
    }

    Ok(init_logging(&log_config)?)
}
