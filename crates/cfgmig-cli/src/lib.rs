//! cfgmig command-line front-end
//!
//! Library half of the `cfgmig` binary: file loading, the `plan` and `run`
//! subcommands and their reports.

#![warn(unreachable_pub)]

pub mod commands;

pub use commands::{plan, run, write_document, Inputs, RunOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
