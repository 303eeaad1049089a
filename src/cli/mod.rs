//! CLI module for the hierarchy group reconciler.
//!
//! This module provides the command-line interface that stands in for the
//! workflow engine: it loads request documents, persists callback contexts
//! between runs and drives the update handler.

mod commands;
mod output;

pub use commands::{Cli, Commands, ContextCommands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
