//! The islcheck Command-Line Interface.
//!
//! This module is the main entry point for the binary: it parses arguments,
//! builds the [`HarnessConfig`], runs the selected suites and turns the
//! result into the process exit status.

use crate::cli::args::HarnessArgs;
use crate::cli::output::ConsoleReporter;
use crate::config::{HarnessConfig, SearchPath};
use crate::errors::{print_error, HarnessError};
use crate::orchestrator::run_suites;
use crate::summary::{exit_code, write_report};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = HarnessArgs::parse();
    init_tracing(args.verbose);

    match execute(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

/// Runs the suites selected by `args` and returns the exit status.
pub fn execute(args: &HarnessArgs) -> Result<i32, HarnessError> {
    let kinds = args.suite.kinds();

    if !args.output_dir.is_dir() {
        return Err(HarnessError::configuration(format!(
            "output directory not found at {}",
            args.output_dir.display()
        )));
    }

    let config = HarnessConfig::new(&args.srcdir)?
        .with_differ_command(&args.diff)?
        .with_output_dir(&args.output_dir)
        .with_timeout(args.timeout())
        .resolve_for(
            &kinds,
            &args.exeext,
            &args.overrides(),
            &SearchPath::from_env(),
        )?;

    let mut reporter = ConsoleReporter::new(args.color.choice());
    let summaries = run_suites(&config, &kinds, &mut reporter)?;

    if let Some(path) = &args.report {
        write_report(path, &summaries)?;
    }
    Ok(exit_code(&summaries))
}

/// Installs the stderr tracing subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
