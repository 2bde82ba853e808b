//! # gopin - Go dependency pinning and vendoring
//!
//! gopin records the exact revision of every third-party package a Go
//! project imports, copies those sources into the project, and can put a
//! workspace back at the recorded revisions later.
//!
//! ## Commands
//!
//! ```bash
//! gopin save            # pin and vendor everything the project imports
//! gopin restore         # check out every pinned revision in the workspace
//! gopin update pkg/...  # re-pin matching dependencies at their checkout
//! gopin outdated        # list dependencies that drifted from their pin
//! ```
//!
//! ## Module Organization
//!
//! - [`manifest`] - `Godeps/Godeps.json` reading and writing
//! - [`loader`] - package metadata from the toolchain plus import scanning
//! - [`vcs`] - version-control adapters
//! - [`deps`] - resolution, pin carrying, diffing and vendoring
//! - [`commands`] - the workflows behind each subcommand

/// Workflow orchestrators (`save`, `restore`, `update`, `outdated`).
pub mod commands;

/// Run configuration (`gopin.toml`, environment, flags).
pub mod config;

/// Dependency resolution, carrying and vendoring.
pub mod deps;

/// Error kinds.
pub mod error;

/// Package metadata loading.
pub mod loader;

/// Manifest codec.
pub mod manifest;

/// Subprocess helpers.
pub mod process;

/// Terminal UI utilities (status lines, tables).
pub mod ui;

/// Version-control adapters.
pub mod vcs;

#[cfg(test)]
mod testutil;

pub use error::Error;
