//! launchkit - Game client installation from release assets
//!
//! This library installs a game client published as a multi-part 7z archive
//! on a release host. It verifies every part against a SHA-256 manifest,
//! re-downloads only what is missing or corrupt, and records the installed
//! version so repeated runs do no redundant work.
//!
//! - [`manager`]: the install pipeline
//! - [`config`]: INI configuration file
//! - [`logging`]: `tracing` subscriber setup for binaries

pub mod config;
pub mod logging;
pub mod manager;
