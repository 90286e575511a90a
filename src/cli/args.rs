//! Defines the command-line arguments for the islcheck CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use termcolor::ColorChoice;

use crate::kinds::ToolKind;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "islcheck",
    version,
    about = "Runs the ISL command-line tools against their golden fixtures."
)]
pub struct HarnessArgs {
    /// Which suite to run.
    #[arg(value_enum)]
    pub suite: Suite,

    /// Root of the ISL source tree holding `test_inputs/`.
    #[arg(long, required = true)]
    pub srcdir: PathBuf,

    /// Suffix appended to every executable name.
    #[arg(long, default_value = "")]
    pub exeext: String,

    /// Path to the isl_bound executable [default: isl_bound]
    #[arg(long = "isl-bound", visible_alias = "isl-bound-path")]
    pub isl_bound: Option<PathBuf>,

    /// Path to the isl_codegen executable [default: isl_codegen]
    #[arg(long = "isl-codegen", visible_alias = "isl-codegen-path")]
    pub isl_codegen: Option<PathBuf>,

    /// Path to the isl_flow executable [default: isl_flow]
    #[arg(long = "isl-flow", visible_alias = "isl-flow-path")]
    pub isl_flow: Option<PathBuf>,

    /// Path to the isl_flow_cmp executable [default: isl_flow_cmp]
    #[arg(long = "isl-flow-cmp", visible_alias = "isl-flow-cmp-path")]
    pub isl_flow_cmp: Option<PathBuf>,

    /// Path to the isl_pip executable [default: isl_pip]
    #[arg(long = "isl-pip", visible_alias = "isl-pip-path")]
    pub isl_pip: Option<PathBuf>,

    /// Path to the isl_schedule executable [default: isl_schedule]
    #[arg(long = "isl-schedule", visible_alias = "isl-schedule-path")]
    pub isl_schedule: Option<PathBuf>,

    /// Path to the isl_schedule_cmp executable [default: isl_schedule_cmp]
    #[arg(long = "isl-schedule-cmp", visible_alias = "isl-schedule-cmp-path")]
    pub isl_schedule_cmp: Option<PathBuf>,

    /// Differ command line, e.g. "cmake -E compare_files".
    #[arg(long, default_value = "diff", allow_hyphen_values = true)]
    pub diff: String,

    /// Directory receiving temporary `test-*` outputs.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Kill any tool still running after this many seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Write a JSON report of every configuration to this file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// When to colour the output.
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto)]
    pub color: ColorWhen,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// A single kind or every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    Bound,
    Codegen,
    Flow,
    Pip,
    Schedule,
    All,
}

impl Suite {
    pub fn kinds(&self) -> Vec<ToolKind> {
        match self {
            Suite::Bound => vec![ToolKind::Bound],
            Suite::Codegen => vec![ToolKind::Codegen],
            Suite::Flow => vec![ToolKind::Flow],
            Suite::Pip => vec![ToolKind::Pip],
            Suite::Schedule => vec![ToolKind::Schedule],
            Suite::All => ToolKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

impl ColorWhen {
    pub fn choice(&self) -> ColorChoice {
        match self {
            ColorWhen::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorWhen::Auto => ColorChoice::Never,
            ColorWhen::Always => ColorChoice::Always,
            ColorWhen::Never => ColorChoice::Never,
        }
    }
}

impl HarnessArgs {
    /// Executable overrides keyed by declared name.
    pub fn overrides(&self) -> BTreeMap<String, PathBuf> {
        [
            ("isl_bound", &self.isl_bound),
            ("isl_codegen", &self.isl_codegen),
            ("isl_flow", &self.isl_flow),
            ("isl_flow_cmp", &self.isl_flow_cmp),
            ("isl_pip", &self.isl_pip),
            ("isl_schedule", &self.isl_schedule),
            ("isl_schedule_cmp", &self.isl_schedule_cmp),
        ]
        .into_iter()
        .filter_map(|(name, path)| path.clone().map(|p| (name.to_string(), p)))
        .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
