//! Drives fixtures × option points through build → run → compare.
//!
//! Per fixture: `Discovered → Running → Compared → {Cleaned | Kept}` for each
//! option point in declared order. Matching outputs are deleted at once;
//! anything else keeps its output file as evidence and is narrated through
//! the [`Reporter`]. Configuration and launch errors unwind immediately;
//! tool failures and mismatches are folded into the [`TestRunSummary`].

use std::fs;
use std::io;

use tracing::{debug, warn};

use crate::compare::{compare, Comparison, Outcome};
use crate::config::HarnessConfig;
use crate::discovery::{discover, Fixture};
use crate::errors::HarnessError;
use crate::invocation::{build_invocation, Invocation};
use crate::kinds::{FailurePolicy, KindSpec, OptionPoint, Oracle, ToolKind};
use crate::process;
use crate::summary::TestRunSummary;

/// Receives progress and failure narration from the orchestrator.
pub trait Reporter {
    fn suite_started(&mut self, kind: ToolKind);
    fn fixture_started(&mut self, fixture: &Fixture);
    fn point_passed(&mut self, fixture: &Fixture, point: &OptionPoint);
    fn point_failed(
        &mut self,
        kind: ToolKind,
        fixture: &Fixture,
        invocation: &Invocation,
        outcome: &Outcome,
    );
    fn suite_finished(&mut self, summary: &TestRunSummary);
}

/// Runs every kind in `kinds`, in order.
///
/// A kind whose policy stops at the first failure only cuts its own suite
/// short; the remaining kinds still run.
pub fn run_suites(
    config: &HarnessConfig,
    kinds: &[ToolKind],
    reporter: &mut dyn Reporter,
) -> Result<Vec<TestRunSummary>, HarnessError> {
    let mut summaries = Vec::with_capacity(kinds.len());
    for kind in kinds {
        summaries.push(run_suite(config, kind.spec(), &mut *reporter)?);
    }
    Ok(summaries)
}

/// Runs one kind's suite.
pub fn run_suite(
    config: &HarnessConfig,
    spec: &KindSpec,
    reporter: &mut dyn Reporter,
) -> Result<TestRunSummary, HarnessError> {
    let fixtures = discover(spec, &config.corpus_dir())?;
    let tool = config.executable(spec.tool)?;
    let oracle_argv = match spec.oracle {
        Oracle::SelfTest => Vec::new(),
        Oracle::Differ => config.differ.clone(),
        Oracle::Comparator(name) => vec![config.executable(name)?.display().to_string()],
    };
    let comparison = match spec.oracle {
        Oracle::SelfTest => Comparison::SelfTest,
        Oracle::Differ | Oracle::Comparator(_) => Comparison::External(&oracle_argv),
    };
    let points = spec.points();

    reporter.suite_started(spec.kind);
    let mut summary = TestRunSummary::new(spec.kind);

    'fixtures: for fixture in &fixtures {
        reporter.fixture_started(fixture);
        for point in &points {
            let invocation = build_invocation(spec, tool, fixture, point, &config.output_dir);
            let outcome = match process::run(&invocation, config.timeout) {
                Ok(result) => compare(&invocation, &result, comparison)?,
                Err(err) if err.is_launch() && spec.policy == FailurePolicy::Continue => {
                    Outcome::LaunchFailure {
                        message: err.to_string(),
                    }
                }
                Err(err) => return Err(err),
            };

            if outcome.is_match() {
                clean_up(&invocation)?;
                reporter.point_passed(fixture, point);
                summary.record(fixture, point, outcome);
                continue;
            }

            reporter.point_failed(spec.kind, fixture, &invocation, &outcome);
            summary.record(fixture, point, outcome);
            if spec.policy == FailurePolicy::StopRun {
                debug!(kind = %spec.kind, fixture = %fixture.display, "stopping at first failure");
                summary.aborted = true;
                break 'fixtures;
            }
        }
    }

    reporter.suite_finished(&summary);
    Ok(summary)
}

/// Removes a matched configuration's output file.
fn clean_up(invocation: &Invocation) -> Result<(), HarnessError> {
    let Some(path) = invocation.output_path() else {
        return Ok(());
    };
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "output file vanished before cleanup");
            Ok(())
        }
        Err(e) => Err(HarnessError::io(path, e)),
    }
}
