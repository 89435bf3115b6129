//! `launchkit status`: report the installed version.

use std::path::PathBuf;

use clap::Args;
use console::style;
use launchkit::config::{ConfigFile, ConfigKey};
use launchkit::manager::VersionMarkerStore;

use crate::error::CliError;

/// Arguments for `launchkit status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Client directory to inspect (defaults to paths.install_dir)
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,
}

/// Run the status command.
pub fn run(args: StatusArgs, config: &ConfigFile) -> Result<(), CliError> {
    let install_dir = args
        .install_dir
        .or_else(|| config.paths.install_dir.clone())
        .ok_or_else(|| {
            CliError::Config(format!(
                "{} is not set. Use --install-dir or 'launchkit config set {} <DIR>'.",
                ConfigKey::PathsInstallDir,
                ConfigKey::PathsInstallDir
            ))
        })?;

    let store = VersionMarkerStore::new(&install_dir);
    let installed = store.read();

    println!("Install directory: {}", install_dir.display());
    match &installed {
        Some(version) => println!("Installed version: {}", style(version).bold()),
        None => println!("Installed version: {}", style("(none)").dim()),
    }

    if let Some(wanted) = config.release.tag.as_deref() {
        println!("Configured tag:    {}", wanted);
        if installed.as_deref() == Some(wanted.trim()) {
            println!("{}", style("Up to date").green());
        } else {
            println!("{}", style("Run 'launchkit install' to update").yellow());
        }
    }

    Ok(())
}
