// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Strongbox Node
//!
//! Entry point for the `strongbox-node` binary. Parses CLI arguments,
//! initializes logging and metrics, builds a ledger from configuration, and
//! replays an operation script against it.
//!
//! The binary supports three subcommands:
//!
//! - `run`: execute a script and print results plus a snapshot
//! - `check-config`: validate a configuration file
//! - `version`: print build version information

mod cli;
mod logging;
mod metrics;
mod runtime;
mod script;
mod settings;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};

use strongbox_protocol::config::{CANONICAL_DECIMALS, NATIVE_DECIMALS};

use cli::{Commands, StrongboxCli};
use logging::LogFormat;
use metrics::LedgerMetrics;
use runtime::Runtime;
use settings::NodeConfig;

fn main() -> Result<()> {
    let cli = StrongboxCli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::CheckConfig(args) => check_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds the ledger and replays the script, one JSON line per step.
fn run(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    let config = NodeConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let operations = script::load(&args.script)
        .with_context(|| format!("failed to load script {}", args.script.display()))?;
    let metrics = LedgerMetrics::new().context("failed to create metrics registry")?;
    let runtime = Runtime::from_config(&config).context("failed to build ledger")?;

    tracing::info!(
        config = %args.config.display(),
        script = %args.script.display(),
        operations = operations.len(),
        "starting run"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut rejected = 0usize;

    for (index, op) in operations.iter().enumerate() {
        let outcome = runtime.execute(index, op);
        metrics.record(&outcome);
        serde_json::to_writer(&mut out, &outcome).context("failed to write outcome")?;
        writeln!(out)?;

        if !outcome.ok {
            rejected += 1;
            if args.fail_fast {
                out.flush()?;
                bail!(
                    "operation {index} ({}) rejected: {}",
                    outcome.op,
                    outcome.error.unwrap_or_default()
                );
            }
        }
    }

    let bank = runtime.bank();
    metrics.observe(bank);
    serde_json::to_writer_pretty(&mut out, &runtime.summary(rejected))
        .context("failed to write snapshot")?;
    writeln!(out)?;

    if args.metrics {
        let text = metrics.encode().context("failed to encode metrics")?;
        out.write_all(text.as_bytes())?;
    }
    out.flush()?;

    tracing::info!(
        operations = operations.len(),
        rejected,
        total_deposited = %bank.total_deposited(),
        "run finished"
    );
    Ok(())
}

/// Parses and validates a config, building the ledger to surface
/// registration errors, then prints a short summary.
fn check_config(args: cli::CheckConfigArgs) -> Result<()> {
    logging::init_logging("warn", LogFormat::Pretty);

    let config = NodeConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    Runtime::from_config(&config).context("configuration rejected by the ledger")?;

    println!("Configuration OK: {}", args.config.display());
    println!("  Deployer       : {}", config.deployer);
    println!("  Bank cap       : {} (canonical units)", config.ledger.bank_cap);
    println!("  Withdraw limit : {} (wei)", config.ledger.withdraw_limit);
    println!("  Users          : {}", config.users.len());
    println!("  Assets         : {}", config.assets.len());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("strongbox-node {}", env!("CARGO_PKG_VERSION"));
    println!("precision      native={NATIVE_DECIMALS} canonical={CANONICAL_DECIMALS}");
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
