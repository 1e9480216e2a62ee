//! # CLI Interface
//!
//! Defines the command-line argument structure for `strongbox-node` using
//! `clap` derive. Supports three subcommands: `run`, `check-config`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default tracing directives when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "strongbox_node=info,strongbox_contracts=info,strongbox_protocol=info";

/// Strongbox ledger runner.
///
/// Builds a ledger from a TOML configuration, backs it with the in-memory
/// transfer agent, and replays a JSON script of operations against it.
/// Results go to stdout as JSON lines; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "strongbox-node",
    about = "Strongbox custodial ledger runner",
    version,
    propagate_version = true
)]
pub struct StrongboxCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay an operation script against a freshly configured ledger.
    Run(RunArgs),
    /// Parse and validate a configuration file, then exit.
    CheckConfig(CheckConfigArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the ledger configuration file (TOML).
    #[arg(long, short = 'c', env = "STRONGBOX_CONFIG")]
    pub config: PathBuf,

    /// Path to the operation script (JSON array).
    #[arg(long, short = 's', env = "STRONGBOX_SCRIPT")]
    pub script: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "STRONGBOX_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    pub log_level: String,

    /// Print Prometheus metrics after the final snapshot.
    #[arg(long)]
    pub metrics: bool,

    /// Stop at the first rejected operation with a non-zero exit status.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for the `check-config` subcommand.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the ledger configuration file (TOML).
    #[arg(long, short = 'c', env = "STRONGBOX_CONFIG")]
    pub config: PathBuf,
}
