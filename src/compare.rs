//! Classifies one execution into a [`Outcome`].
//!
//! A failing tool and a mismatching output are ordinary, reportable data.
//! Only a differ or comparator that cannot be started is an error.

use std::path::Path;

use serde::Serialize;

use crate::errors::HarnessError;
use crate::invocation::Invocation;
use crate::process::{self, ExecutionResult, Termination};

/// The verdict for one (fixture, option point) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Match,
    /// The oracle rejected the output; `diagnostic` is its own text.
    Mismatch { diagnostic: String },
    /// The tool under test exited non-zero or was signaled.
    ToolFailure {
        termination: Termination,
        output: String,
    },
    /// The tool under test was killed after the configured timeout.
    TimedOut {
        termination: Termination,
        output: String,
    },
    /// The tool under test could not be started and the kind keeps going.
    LaunchFailure { message: String },
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Match)
    }
}

/// How produced output is judged against its reference.
#[derive(Debug, Clone, Copy)]
pub enum Comparison<'a> {
    /// The tool's exit status is the oracle.
    SelfTest,
    /// `argv[0] argv[1..] <reference> <output>`; used for both an external
    /// differ and a dedicated comparator executable.
    External(&'a [String]),
}

/// Decides the outcome of `result`.
///
/// The tool's own failure wins over comparison: a tool that exited
/// non-zero is never compared.
pub fn compare(
    invocation: &Invocation,
    result: &ExecutionResult,
    comparison: Comparison<'_>,
) -> Result<Outcome, HarnessError> {
    match result.termination {
        Termination::TimedOut { .. } => {
            return Ok(Outcome::TimedOut {
                termination: result.termination,
                output: result.diagnostic_text().to_string(),
            })
        }
        t if !t.success() => {
            return Ok(Outcome::ToolFailure {
                termination: t,
                output: result.diagnostic_text().to_string(),
            })
        }
        _ => {}
    }

    let argv = match comparison {
        Comparison::SelfTest => return Ok(Outcome::Match),
        Comparison::External(argv) => argv,
    };
    let (Some(reference), Some(output)) = (invocation.reference.as_deref(), invocation.output_path())
    else {
        return Ok(Outcome::Match);
    };
    compare_files(argv, reference, output)
}

/// Runs an external oracle on `(reference, output)`; exit status zero is a
/// match, anything else a mismatch carrying the oracle's output.
pub fn compare_files(
    argv: &[String],
    reference: &Path,
    output: &Path,
) -> Result<Outcome, HarnessError> {
    let Some((program, rest)) = argv.split_first() else {
        return Err(HarnessError::configuration("comparison command is empty"));
    };
    let mut args: Vec<String> = rest.to_vec();
    args.push(reference.display().to_string());
    args.push(output.display().to_string());

    let (termination, text) = process::run_captured(Path::new(program), &args)?;
    if termination.success() {
        Ok(Outcome::Match)
    } else {
        Ok(Outcome::Mismatch { diagnostic: text })
    }
}
