//! CLI interface and argument parsing
//!
//! This module handles command-line interface parsing and the `complete`,
//! `parse` and `commands` subcommands.

pub mod app;

// Re-export main types
pub use app::*;
