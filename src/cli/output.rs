//! Handles all user-facing output for the CLI.
//!
//! Progress and failure narration share stdout so a captured log keeps each
//! failure next to its fixture line. The wording lives in the `*_line`
//! helpers so the colour console and the plain buffer used in tests always
//! agree.

use std::fs;
use std::io::Write;
use std::path::Path;

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::compare::Outcome;
use crate::discovery::Fixture;
use crate::invocation::Invocation;
use crate::kinds::{OptionPoint, ToolKind};
use crate::orchestrator::Reporter;
use crate::summary::TestRunSummary;

// ============================================================================
// WORDING
// ============================================================================

pub fn suite_started_line(kind: ToolKind) -> String {
    format!("Running {kind} tests:")
}

pub fn point_passed_line(point: &OptionPoint) -> String {
    format!("  ✓ {}", point.label)
}

/// First line of a failure, naming the kind, fixture and options. `None`
/// for a match, which has nothing to narrate.
pub fn failure_headline(
    kind: ToolKind,
    fixture: &Fixture,
    invocation: &Invocation,
    outcome: &Outcome,
) -> Option<String> {
    let with_options = if invocation.options.is_empty() {
        String::new()
    } else {
        format!(" with options: {}", invocation.options_display())
    };
    let name = kind.display_name();
    let fixture = &fixture.display;
    let line = match outcome {
        Outcome::Match => return None,
        Outcome::Mismatch { .. } => {
            format!("{name} comparison failed for {fixture}{with_options}:")
        }
        Outcome::ToolFailure { termination, .. } => {
            format!("{name} test failed for {fixture}{with_options} ({termination})")
        }
        Outcome::TimedOut { termination, .. } => {
            format!("{name} test {termination} for {fixture}{with_options}")
        }
        Outcome::LaunchFailure { message } => {
            format!("{name} test could not start for {fixture}: {message}")
        }
    };
    Some(line)
}

/// Captured text accompanying a failure, if any.
pub fn failure_body(outcome: &Outcome) -> Option<&str> {
    let text = match outcome {
        Outcome::Mismatch { diagnostic } => diagnostic,
        Outcome::ToolFailure { output, .. } | Outcome::TimedOut { output, .. } => output,
        Outcome::Match | Outcome::LaunchFailure { .. } => return None,
    };
    (!text.trim().is_empty()).then_some(text.as_str())
}

pub fn kept_output_line(path: &Path) -> String {
    format!("  output kept at {}", path.display())
}

pub fn suite_verdict_line(summary: &TestRunSummary) -> String {
    if summary.all_passed() {
        format!("All {} tests passed!", summary.kind)
    } else {
        format!("Some {} tests failed!", summary.kind)
    }
}

pub fn suite_tally_line(summary: &TestRunSummary) -> String {
    format!(
        "{}: {} passed, {} failed ({} configurations)",
        summary.kind,
        summary.passed(),
        summary.failed(),
        summary.records.len()
    )
}

/// Line diff of reference against output, when both are readable text.
pub fn file_diff(reference: &Path, output: &Path) -> Option<Vec<Difference>> {
    let expected = fs::read_to_string(reference).ok()?;
    let actual = fs::read_to_string(output).ok()?;
    Some(Changeset::new(&expected, &actual, "\n").diffs)
}

// ============================================================================
// BUFFER REPORTER
// ============================================================================

/// Collects plain-text narration, one entry per line, for tests and
/// programmatic capture.
#[derive(Debug, Default)]
pub struct BufferReporter {
    pub lines: Vec<String>,
}

impl BufferReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Reporter for BufferReporter {
    fn suite_started(&mut self, kind: ToolKind) {
        self.lines.push(suite_started_line(kind));
    }

    fn fixture_started(&mut self, fixture: &Fixture) {
        self.lines.push(fixture.display.clone());
    }

    fn point_passed(&mut self, _fixture: &Fixture, point: &OptionPoint) {
        self.lines.push(point_passed_line(point));
    }

    fn point_failed(
        &mut self,
        kind: ToolKind,
        fixture: &Fixture,
        invocation: &Invocation,
        outcome: &Outcome,
    ) {
        let Some(headline) = failure_headline(kind, fixture, invocation, outcome) else {
            return;
        };
        self.lines.push(headline);
        if let Some(body) = failure_body(outcome) {
            self.lines.extend(body.lines().map(str::to_string));
        }
        if let Some(path) = invocation.output_path() {
            self.lines.push(kept_output_line(path));
        }
    }

    fn suite_finished(&mut self, summary: &TestRunSummary) {
        self.lines.push(suite_verdict_line(summary));
        self.lines.push(suite_tally_line(summary));
    }
}

// ============================================================================
// CONSOLE REPORTER
// ============================================================================

/// Writes coloured narration to the terminal.
pub struct ConsoleReporter {
    stdout: StandardStream,
}

impl ConsoleReporter {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn out(&mut self, text: &str, color: Option<Color>) {
        self.styled(text, color, false);
    }

    fn styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let _ = self
            .stdout
            .set_color(ColorSpec::new().set_fg(color).set_bold(bold));
        let _ = writeln!(self.stdout, "{text}");
        let _ = self.stdout.reset();
        let _ = self.stdout.flush();
    }

    fn print_diff(&mut self, diffs: &[Difference]) {
        for diff in diffs {
            match diff {
                Difference::Same(x) => {
                    for line in x.lines() {
                        self.out(&format!(" {line}"), None);
                    }
                }
                Difference::Add(x) => {
                    for line in x.lines() {
                        self.out(&format!("+{line}"), Some(Color::Green));
                    }
                }
                Difference::Rem(x) => {
                    for line in x.lines() {
                        self.out(&format!("-{line}"), Some(Color::Red));
                    }
                }
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn suite_started(&mut self, kind: ToolKind) {
        self.out(&suite_started_line(kind), Some(Color::Yellow));
    }

    fn fixture_started(&mut self, fixture: &Fixture) {
        self.out(&fixture.display, None);
    }

    fn point_passed(&mut self, _fixture: &Fixture, point: &OptionPoint) {
        self.out(&point_passed_line(point), Some(Color::Green));
    }

    fn point_failed(
        &mut self,
        kind: ToolKind,
        fixture: &Fixture,
        invocation: &Invocation,
        outcome: &Outcome,
    ) {
        let Some(headline) = failure_headline(kind, fixture, invocation, outcome) else {
            return;
        };
        self.styled(&headline, Some(Color::Red), true);
        match failure_body(outcome) {
            Some(body) => self.out(body.trim_end(), None),
            None => {
                // A silent comparator still deserves a visible diff.
                if let (Outcome::Mismatch { .. }, Some(reference), Some(output)) = (
                    outcome,
                    invocation.reference.as_deref(),
                    invocation.output_path(),
                ) {
                    if let Some(diffs) = file_diff(reference, output) {
                        self.print_diff(&diffs);
                    }
                }
            }
        }
        if let Some(path) = invocation.output_path() {
            self.out(&kept_output_line(path), Some(Color::Yellow));
        }
    }

    fn suite_finished(&mut self, summary: &TestRunSummary) {
        let color = if summary.all_passed() {
            Color::Green
        } else {
            Color::Red
        };
        self.out(&suite_verdict_line(summary), Some(color));
        self.out(&suite_tally_line(summary), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::StdoutTarget;
    use crate::process::Termination;
    use std::path::PathBuf;

    fn invocation(options: &[&str]) -> Invocation {
        Invocation {
            program: PathBuf::from("isl_pip"),
            args: Vec::new(),
            options: options.iter().map(|s| s.to_string()).collect(),
            stdin: PathBuf::from("in/ex.pip"),
            stdout: StdoutTarget::Capture,
            reference: None,
        }
    }

    #[test]
    fn tool_failure_headline_names_the_configuration() {
        let fixture = Fixture::from_path("in/ex.pip", "ex.pip");
        let outcome = Outcome::ToolFailure {
            termination: Termination::Exited { code: 1 },
            output: "boom\n".to_string(),
        };
        let line = failure_headline(
            ToolKind::Pip,
            &fixture,
            &invocation(&["--format=set", "--context=gbr"]),
            &outcome,
        );
        assert_eq!(
            line.as_deref(),
            Some("PIP test failed for ex.pip with options: --format=set --context=gbr (exit status 1)")
        );
        assert_eq!(failure_body(&outcome), Some("boom\n"));
    }

    #[test]
    fn a_match_has_no_failure_narration() {
        let fixture = Fixture::from_path("in/ex.pip", "ex.pip");
        let outcome = Outcome::Match;
        assert!(failure_headline(ToolKind::Pip, &fixture, &invocation(&[]), &outcome).is_none());
        assert!(failure_body(&outcome).is_none());

        let mut reporter = BufferReporter::new();
        reporter.point_failed(ToolKind::Pip, &fixture, &invocation(&[]), &outcome);
        assert!(reporter.lines.is_empty());
    }

    #[test]
    fn empty_diagnostics_have_no_body() {
        let outcome = Outcome::Mismatch {
            diagnostic: "  \n".to_string(),
        };
        assert!(failure_body(&outcome).is_none());
    }

    #[test]
    fn buffer_reporter_records_progress_in_order() {
        let fixture = Fixture::from_path("in/ex.pip", "ex.pip");
        let point = OptionPoint::empty("bernstein");
        let mut reporter = BufferReporter::new();
        reporter.suite_started(ToolKind::Bound);
        reporter.fixture_started(&fixture);
        reporter.point_passed(&fixture, &point);
        assert_eq!(
            reporter.lines,
            vec!["Running bound tests:", "ex.pip", "  ✓ bernstein"]
        );
    }

    #[test]
    fn file_diff_marks_the_changed_line() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("a.c");
        let output = dir.path().join("test-a.c");
        fs::write(&reference, "x\ny\nz").unwrap();
        fs::write(&output, "x\nY\nz").unwrap();

        let diffs = file_diff(&reference, &output).unwrap();
        assert!(diffs.contains(&Difference::Rem("y".to_string())));
        assert!(diffs.contains(&Difference::Add("Y".to_string())));
    }
}
