//! `launchkit install`: run the install pipeline with live progress.

use std::path::PathBuf;
use std::thread;

use clap::Args;
use console::style;
use indicatif::HumanBytes;
use launchkit::config::ConfigFile;
use launchkit::manager::{install_client, ChannelObserver, InstallOutcome, InstallRequest};
use tracing::info;

use crate::error::CliError;
use crate::progress::ProgressView;

/// Environment variable consulted for an access token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Events buffered between the install worker and the terminal.
const EVENT_CAPACITY: usize = 1024;

/// Arguments for `launchkit install`. Every flag overrides `config.ini`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Repository owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// Release tag to install
    #[arg(long)]
    pub tag: Option<String>,

    /// Directory the client is extracted into
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Directory archive parts are downloaded to
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Path to the 7-Zip executable (7z, 7za or 7z.exe)
    #[arg(long, value_name = "PATH")]
    pub extractor: Option<PathBuf>,

    /// Access token for private repositories (falls back to $GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Keep downloaded parts after a successful install
    #[arg(long)]
    pub keep_parts: bool,

    /// Install even if this version is already recorded as installed
    #[arg(long)]
    pub force: bool,

    /// Skip the free disk space check
    #[arg(long)]
    pub no_space_check: bool,
}

/// Run the install command.
pub fn run(args: InstallArgs, config: &ConfigFile) -> Result<(), CliError> {
    let env_token = std::env::var(TOKEN_ENV).ok();
    let request = build_request(args, config, env_token)?;

    info!(
        owner = %request.owner,
        repo = %request.repo,
        tag = %request.tag,
        install_dir = %request.install_dir.display(),
        "Starting install"
    );

    let outcome = run_with_progress(request)?;
    print_outcome(&outcome);
    Ok(())
}

/// Overlay command-line flags on the configuration file.
///
/// Token precedence: `--token`, then the environment, then `config.ini`.
fn build_request(
    args: InstallArgs,
    config: &ConfigFile,
    env_token: Option<String>,
) -> Result<InstallRequest, CliError> {
    let mut merged = config.clone();

    if args.owner.is_some() {
        merged.release.owner = args.owner;
    }
    if args.repo.is_some() {
        merged.release.repo = args.repo;
    }
    if args.tag.is_some() {
        merged.release.tag = args.tag;
    }
    if args.install_dir.is_some() {
        merged.paths.install_dir = args.install_dir;
    }
    if args.download_dir.is_some() {
        merged.paths.download_dir = args.download_dir;
    }
    if args.extractor.is_some() {
        merged.paths.extractor = args.extractor;
    }

    let token = args
        .token
        .or(env_token)
        .or_else(|| merged.release.token.clone());

    let mut request = merged.to_request()?.with_token(token);
    if args.keep_parts {
        request = request.with_cleanup_parts(false);
    }
    if args.force {
        request = request.with_skip_if_installed(false);
    }
    if args.no_space_check {
        request = request.with_space_margin(None);
    }
    Ok(request)
}

/// Run the pipeline on a worker thread and render its events until it ends.
fn run_with_progress(request: InstallRequest) -> Result<InstallOutcome, CliError> {
    let (observer, events) = ChannelObserver::new(EVENT_CAPACITY);

    let worker = thread::Builder::new()
        .name("install".to_string())
        .spawn(move || install_client(&request, &observer))
        .map_err(|e| CliError::Worker(e.to_string()))?;

    // The channel closes when the worker drops its observer
    let mut view = ProgressView::new();
    for event in events {
        view.handle(event);
    }
    view.finish();

    let result = worker
        .join()
        .map_err(|_| CliError::Worker("install thread panicked".to_string()))?;
    Ok(result?)
}

fn print_outcome(outcome: &InstallOutcome) {
    if outcome.skipped {
        println!(
            "{} {} is already installed in {}",
            style("✓").green().bold(),
            outcome.version,
            outcome.install_dir.display()
        );
        return;
    }

    println!(
        "{} Installed {} into {}",
        style("✓").green().bold(),
        style(&outcome.version).bold(),
        outcome.install_dir.display()
    );
    println!("  {}", download_summary(outcome));
}

fn download_summary(outcome: &InstallOutcome) -> String {
    format!(
        "{} part(s) downloaded ({}), {} reused",
        outcome.parts_downloaded,
        HumanBytes(outcome.bytes_downloaded),
        outcome.parts_reused
    )
}
