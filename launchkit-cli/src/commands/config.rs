//! Configuration management CLI commands.
//!
//! Provides `config init`, `config get`, `config set`, `config list`, and
//! `config path` for viewing and modifying settings from the command line.

use std::fs;
use std::path::Path;

use clap::Subcommand;
use launchkit::config::{ConfigFile, ConfigKey, CONFIG_TEMPLATE};

use super::{config_path, load_config};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a commented configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., release.tag)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., release.tag)
        key: String,

        /// Value to set (empty to clear)
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, custom: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(custom, force),
        ConfigCommands::Get { key } => run_get(custom, &key),
        ConfigCommands::Set { key, value } => run_set(custom, &key, &value),
        ConfigCommands::List => run_list(custom),
        ConfigCommands::Path => run_path(custom),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'launchkit config list' to see available keys.",
            key
        ))
    })
}

/// Load for editing: a missing file starts from defaults.
fn load_or_default(custom: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = config_path(custom)?;
    if path.exists() {
        load_config(Some(&path))
    } else {
        Ok(ConfigFile::default())
    }
}

fn run_init(custom: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path(custom)?;
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, CONFIG_TEMPLATE)
    };
    write().map_err(|e| CliError::Config(format!("Failed to write {}: {}", path.display(), e)))?;

    println!("Wrote {}", path.display());
    println!("Set release.owner, release.repo, release.tag, paths.install_dir and paths.extractor before installing.");
    Ok(())
}

fn run_get(custom: Option<&Path>, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load_or_default(custom)?;
    let value = config_key.get(&config);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn run_set(custom: Option<&Path>, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let path = config_path(custom)?;

    let mut config = load_or_default(custom)?;
    config_key.set(&mut config, value)?;
    config.save_to(&path)?;

    if config_key.is_secret() {
        println!("Set {}", config_key.name());
    } else {
        println!("Set {} = {}", config_key.name(), value);
    }

    Ok(())
}

fn run_list(custom: Option<&Path>) -> Result<(), CliError> {
    let config = load_or_default(custom)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        let key_name = key.key_name();

        if value.is_empty() {
            println!("  {} = (not set)", key_name);
        } else if key.is_secret() {
            println!("  {} = ********", key_name);
        } else {
            println!("  {} = {}", key_name, value);
        }
    }

    Ok(())
}

fn run_path(custom: Option<&Path>) -> Result<(), CliError> {
    println!("{}", config_path(custom)?.display());
    Ok(())
}
