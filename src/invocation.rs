//! Builds one concrete subprocess invocation from a fixture and a matrix point.

use std::path::{Path, PathBuf};

use crate::discovery::Fixture;
use crate::kinds::{KindSpec, OptionPoint};

/// Marker prefixed to every produced output so it never collides with a
/// golden reference in the same directory.
pub const OUTPUT_PREFIX: &str = "test-";

/// Where the tool's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutTarget {
    /// Merged with stderr into one in-memory capture.
    Capture,
    /// Redirected into a freshly created file.
    File(PathBuf),
}

/// A fully materialized execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    /// Complete argument vector: base flags, then `options`.
    pub args: Vec<String>,
    /// Matrix-point flags followed by embedded directive tokens.
    pub options: Vec<String>,
    /// Input file bound read-only to stdin.
    pub stdin: PathBuf,
    pub stdout: StdoutTarget,
    /// Golden reference, present whenever stdout goes to a file.
    pub reference: Option<PathBuf>,
}

impl Invocation {
    /// The produced output file, if stdout is redirected.
    pub fn output_path(&self) -> Option<&Path> {
        match &self.stdout {
            StdoutTarget::File(path) => Some(path),
            StdoutTarget::Capture => None,
        }
    }

    /// Options as shown in failure narration.
    pub fn options_display(&self) -> String {
        self.options.join(" ")
    }
}

/// Concatenates the matrix point's flags with the embedded directive
/// tokens, in that order.
pub fn merge_options(point: &OptionPoint, embedded: &[String]) -> Vec<String> {
    point.flags.iter().chain(embedded).cloned().collect()
}

/// Reference and temporary output paths for a fixture.
///
/// The reference sits next to the input as `<stem>.<ext>`; the output is
/// `<output_dir>/test-<output_key>[-<slug>].<ext>`, so fixtures sharing a
/// stem across subdirectories never share an output file.
pub fn output_paths(
    fixture: &Fixture,
    ext: &str,
    slug: Option<&str>,
    output_dir: &Path,
) -> (PathBuf, PathBuf) {
    let reference = fixture.dir.join(format!("{}.{ext}", fixture.stem));
    let output_name = match slug {
        Some(slug) if !slug.is_empty() => {
            format!("{OUTPUT_PREFIX}{}-{slug}.{ext}", fixture.output_key)
        }
        _ => format!("{OUTPUT_PREFIX}{}.{ext}", fixture.output_key),
    };
    (reference, output_dir.join(output_name))
}

/// Builds the invocation of `program` for `fixture` at `point`.
pub fn build_invocation(
    spec: &KindSpec,
    program: &Path,
    fixture: &Fixture,
    point: &OptionPoint,
    output_dir: &Path,
) -> Invocation {
    let embedded: &[String] = if spec.reads_directive {
        &fixture.embedded_options
    } else {
        &[]
    };
    let options = merge_options(point, embedded);
    let args = spec
        .base_flags
        .iter()
        .map(|f| f.to_string())
        .chain(options.iter().cloned())
        .collect();

    let (stdout, reference) = match spec.output_ext {
        None => (StdoutTarget::Capture, None),
        Some(ext) => {
            let slug = (spec.matrix.len() > 1).then(|| point.slug());
            let (reference, output) = output_paths(fixture, ext, slug.as_deref(), output_dir);
            (StdoutTarget::File(output), Some(reference))
        }
    };

    Invocation {
        program: program.to_path_buf(),
        args,
        options,
        stdin: fixture.input.clone(),
        stdout,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::ToolKind;

    fn fixture(path: &str) -> Fixture {
        Fixture::from_path(path, path)
    }

    #[test]
    fn flags_equal_the_point_without_a_directive() {
        let spec = ToolKind::Bound.spec();
        for point in spec.points() {
            let inv = build_invocation(
                spec,
                Path::new("isl_bound"),
                &fixture("in/devos.pwqp"),
                &point,
                Path::new("."),
            );
            assert_eq!(inv.options, point.flags);
            let mut expected = vec!["-T".to_string()];
            expected.extend(point.flags.clone());
            assert_eq!(inv.args, expected);
            assert_eq!(inv.stdout, StdoutTarget::Capture);
            assert!(inv.reference.is_none());
        }
    }

    #[test]
    fn directive_tokens_follow_the_point_flags() {
        let spec = ToolKind::Schedule.spec();
        let fx = fixture("in/schedule/feautrier.sc").with_embedded_options(vec![
            "--schedule-algorithm=feautrier".to_string(),
            "--no-schedule-serialize-sccs".to_string(),
        ]);
        let point = &spec.points()[1];
        let inv = build_invocation(spec, Path::new("isl_schedule"), &fx, point, Path::new("out"));
        assert_eq!(
            inv.args,
            vec![
                "--no-schedule-whole-component",
                "--schedule-algorithm=feautrier",
                "--no-schedule-serialize-sccs",
            ]
        );
        assert_eq!(
            inv.reference.as_deref(),
            Some(Path::new("in/schedule/feautrier.st"))
        );
        assert_eq!(
            inv.output_path(),
            Some(Path::new("out/test-feautrier-no-schedule-whole-component.st"))
        );
    }

    #[test]
    fn single_point_outputs_have_no_slug() {
        let spec = ToolKind::Codegen.spec();
        let point = &spec.points()[0];
        let inv = build_invocation(
            spec,
            Path::new("isl_codegen"),
            &fixture("in/codegen/omega/lu.in"),
            point,
            Path::new("."),
        );
        assert!(inv.args.is_empty());
        assert_eq!(inv.reference.as_deref(), Some(Path::new("in/codegen/omega/lu.c")));
        assert_eq!(inv.output_path(), Some(Path::new("./test-lu.c")));
    }

    #[test]
    fn qualified_fixtures_name_their_output_after_the_key() {
        let fx = fixture("in/codegen/cloog/dup.st").with_qualifier("cloog");
        let (reference, output) = output_paths(&fx, "c", None, Path::new("out"));
        assert_eq!(reference, PathBuf::from("in/codegen/cloog/dup.c"));
        assert_eq!(output, PathBuf::from("out/test-cloog-dup.c"));
    }

    #[test]
    fn output_never_collides_with_reference() {
        let fx = fixture("dir/x.ai");
        let (reference, output) = output_paths(&fx, "flow", None, Path::new("dir"));
        assert_ne!(reference, output);
        assert_eq!(output, PathBuf::from("dir/test-x.flow"));
    }
}
