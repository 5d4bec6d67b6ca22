//! Argtree - path-addressed command-line arguments
//!
//! Command lines such as `scw instance server create volumes.0.size=20gb`
//! are unmarshaled into typed requests (or schema-built documents), and the
//! same command registry drives shell completion.

// Public modules
pub mod args;
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{ArgtreeError, Result};

/// Current version of argtree
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
