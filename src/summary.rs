//! Pass/fail ledger for a run, and the exit status derived from it.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::compare::Outcome;
use crate::discovery::Fixture;
use crate::errors::HarnessError;
use crate::kinds::{OptionPoint, ToolKind};

/// One recorded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub fixture: Fixture,
    pub point: OptionPoint,
    pub outcome: Outcome,
}

/// Ordered outcomes of one kind's suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunSummary {
    pub kind: ToolKind,
    pub records: Vec<TestRecord>,
    /// True when the kind's policy stopped the run before the last fixture.
    pub aborted: bool,
}

impl TestRunSummary {
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            aborted: false,
        }
    }

    pub fn record(&mut self, fixture: &Fixture, point: &OptionPoint, outcome: Outcome) {
        self.records.push(TestRecord {
            fixture: fixture.clone(),
            point: point.clone(),
            outcome,
        });
    }

    /// Success iff every recorded outcome is a match and nothing was cut short.
    pub fn all_passed(&self) -> bool {
        !self.aborted && self.records.iter().all(|r| r.outcome.is_match())
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_match()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestRecord> {
        self.records.iter().filter(|r| !r.outcome.is_match())
    }
}

/// Process exit status for a set of suites: 0 iff every suite passed.
pub fn exit_code(summaries: &[TestRunSummary]) -> i32 {
    if summaries.iter().all(TestRunSummary::all_passed) {
        0
    } else {
        1
    }
}

#[derive(Serialize)]
struct Report<'a> {
    all_passed: bool,
    suites: Vec<SuiteReport<'a>>,
}

#[derive(Serialize)]
struct SuiteReport<'a> {
    #[serde(flatten)]
    summary: &'a TestRunSummary,
    all_passed: bool,
    passed: usize,
    failed: usize,
}

/// Renders the summaries as pretty-printed JSON.
pub fn to_json(summaries: &[TestRunSummary]) -> Result<String, serde_json::Error> {
    let report = Report {
        all_passed: exit_code(summaries) == 0,
        suites: summaries
            .iter()
            .map(|summary| SuiteReport {
                summary,
                all_passed: summary.all_passed(),
                passed: summary.passed(),
                failed: summary.failed(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}

/// Writes the JSON run report to `path`.
pub fn write_report(path: &Path, summaries: &[TestRunSummary]) -> Result<(), HarnessError> {
    let json = to_json(summaries).map_err(|e| {
        HarnessError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    fs::write(path, json).map_err(|e| HarnessError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Termination;

    fn summary(outcomes: Vec<Outcome>) -> TestRunSummary {
        let fixture = Fixture::from_path("in/a.pip", "a.pip");
        let mut summary = TestRunSummary::new(ToolKind::Pip);
        for (i, outcome) in outcomes.into_iter().enumerate() {
            summary.record(&fixture, &OptionPoint::empty(format!("p{i}")), outcome);
        }
        summary
    }

    #[test]
    fn exit_code_is_zero_only_when_everything_matches() {
        assert_eq!(exit_code(&[summary(vec![Outcome::Match, Outcome::Match])]), 0);
        assert_eq!(
            exit_code(&[
                summary(vec![Outcome::Match]),
                summary(vec![Outcome::Mismatch {
                    diagnostic: "1c1".to_string()
                }]),
            ]),
            1
        );
    }

    #[test]
    fn an_aborted_suite_never_passes() {
        let mut s = summary(vec![Outcome::Match]);
        s.aborted = true;
        assert!(!s.all_passed());
        assert_eq!(exit_code(&[s]), 1);
    }

    #[test]
    fn counts_split_matches_from_failures() {
        let s = summary(vec![
            Outcome::Match,
            Outcome::ToolFailure {
                termination: Termination::Exited { code: 1 },
                output: String::new(),
            },
            Outcome::Match,
        ]);
        assert_eq!(s.passed(), 2);
        assert_eq!(s.failed(), 1);
        assert_eq!(s.failures().count(), 1);
    }

    #[test]
    fn json_report_tags_each_outcome() {
        let s = summary(vec![
            Outcome::Match,
            Outcome::Mismatch {
                diagnostic: "differs".to_string(),
            },
        ]);
        let json: serde_json::Value = serde_json::from_str(&to_json(&[s]).unwrap()).unwrap();
        assert_eq!(json["all_passed"], serde_json::Value::Bool(false));
        let suite = &json["suites"][0];
        assert_eq!(suite["kind"], "pip");
        assert_eq!(suite["failed"], 1);
        assert_eq!(suite["records"][0]["outcome"]["outcome"], "match");
        assert_eq!(suite["records"][1]["outcome"]["diagnostic"], "differs");
    }
}
