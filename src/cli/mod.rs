//! Command-line interface for monster-forge.
//!
//! Provides the `run`, `sample`, and `cache stats` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
