//! HTTP download support for release assets.
//!
//! This module provides:
//! - Single file downloads with bounded redirect following (`http`)
//! - SHA-256 checksum calculation and verification (`checksum`)
//! - Whole-percent progress tracking (`progress`)
//!
//! # Architecture
//!
//! ```text
//! ClientInstaller (orchestrator, owns retry policy)
//!         │
//!         ├── ContentFetcher (trait)
//!         │       └── HttpFetcher ── PercentTracker
//!         │
//!         └── calculate_file_checksum (streaming SHA-256)
//! ```
//!
//! The fetcher performs exactly one attempt per call. Retrying is the
//! orchestrator's decision.

mod checksum;
mod http;
mod progress;

pub use checksum::{calculate_file_checksum, verify_checksum};
pub use http::{temp_path, HttpFetcher, DEFAULT_TIMEOUT_SECS, MAX_REDIRECTS};
pub use progress::{PercentCallback, PercentTracker};

pub(crate) use http::{same_origin, USER_AGENT};
