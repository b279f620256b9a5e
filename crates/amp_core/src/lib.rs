//! Core provisioning library for the music-ai serving backend.
//!
//! Everything needed to take a checkout from "cloned" to "serving"
//! lives here, split by concern:
//!
//! - [`manifest`] — parsing and fingerprinting of the dependency manifest
//! - [`bootstrap`] — virtual environment creation and dependency install
//! - [`image`] — deterministic container image assembly
//! - [`weights`] — model checkpoint pre-fetch
//! - [`config`] — persistent settings with atomic writes
//! - [`logging`] — per-run log files with progress filtering
//!
//! The crate is UI-free; the `amp` binary provides the command line on
//! top of it.

pub mod bootstrap;
pub mod config;
pub mod image;
pub mod logging;
pub mod manifest;
pub mod weights;

/// Crate version, as baked in at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
