// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegrad-observability
//!
//! Logging setup shared by the spikegrad tools, with per-crate debug flag
//! support.
//!
//! ## Features
//! - `file-logging`: Per-run JSON log files with retention (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known spikegrad crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "spikegrad",
    "spikegrad-tensor",
    "spikegrad-neural",
    "spikegrad-config",
];
