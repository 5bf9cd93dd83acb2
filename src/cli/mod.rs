//! CLI module
//!
//! Command-line interface for running board syncs.
//!
//! # Commands
//!
//! - `run` - Collect, extract and convert boards of one connection
//! - `subtasks` - List the subtask plan with its domain types
//! - `gen-regex` - Compile a repository URL template into a regex

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
