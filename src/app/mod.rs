//! Application Layer
//!
//! Command-line interface for the gesture engine.

pub mod cli;

pub use cli::{Cli, Commands};
