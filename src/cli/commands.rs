//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hgroup - Reconcile Amazon Connect user hierarchy group updates.
#[derive(Parser, Debug)]
#[command(name = "hgroup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "HGROUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log line format (text, json).
    #[arg(long, global = true, default_value = "text", env = "HGROUP_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate an update request document.
    Validate {
        /// Request document (YAML or JSON).
        request: PathBuf,

        /// Show warnings as well as errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the remote calls an update would make.
    Plan {
        /// Request document (YAML or JSON).
        request: PathBuf,
    },

    /// Apply an update.
    Apply {
        /// Request document (YAML or JSON).
        request: PathBuf,

        /// Log the remote calls instead of making them.
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Maximum remote calls in this run; re-run to continue.
        #[arg(long)]
        step_budget: Option<usize>,
    },

    /// Manage stored callback contexts.
    Context {
        /// Context subcommand.
        #[command(subcommand)]
        command: ContextCommands,
    },
}

/// Callback context subcommands.
#[derive(Subcommand, Debug)]
pub enum ContextCommands {
    /// Show the stored context and lock for a request.
    Show {
        /// Request document the context belongs to.
        request: PathBuf,
    },

    /// Delete the stored context for a request.
    Clear {
        /// Request document the context belongs to.
        request: PathBuf,
    },

    /// Release the lock for a request.
    Unlock {
        /// Request document the lock belongs to.
        request: PathBuf,

        /// Lock ID to release.
        #[arg(long)]
        lock_id: Option<String>,

        /// Release whatever lock is held (dangerous).
        #[arg(long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log line format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "hgroup",
            "--output",
            "json",
            "apply",
            "request.yaml",
            "--dry-run",
            "--step-budget",
            "1",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Apply {
                request,
                dry_run,
                yes,
                step_budget,
            } => {
                assert_eq!(request, PathBuf::from("request.yaml"));
                assert!(dry_run);
                assert!(!yes);
                assert_eq!(step_budget, Some(1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_context_unlock() {
        let cli = Cli::try_parse_from(["hgroup", "-v", "context", "unlock", "req.json", "--force"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Context {
                command: ContextCommands::Unlock { force: true, lock_id: None, .. }
            }
        ));
    }

    #[test]
    fn test_request_is_required() {
        assert!(Cli::try_parse_from(["hgroup", "plan"]).is_err());
    }
}
