//! Fixture discovery beneath `<srcdir>/test_inputs`.
//!
//! Listed fixtures keep their declared order. Globbed fixtures are expanded
//! rule by rule, each rule's matches sorted by file name, so failures are
//! reported in the same order on every machine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::HarnessError;
use crate::kinds::{GlobRule, KindSpec, Selection};

static OPTIONS_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"OPTIONS:(.*)").unwrap());

/// One test input plus the directory holding its golden reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// Path of the input file, opened read-only as the tool's stdin.
    pub input: PathBuf,
    /// Name shown in progress output.
    pub display: String,
    /// Input file name without its extension.
    pub stem: String,
    /// Directory holding co-located reference files.
    pub dir: PathBuf,
    /// Name fragment for produced outputs, unique among one kind's fixtures.
    pub output_key: String,
    /// Tokens from an embedded `OPTIONS:` directive; empty when absent.
    pub embedded_options: Vec<String>,
}

impl Fixture {
    /// Builds a fixture from an input path. Does not touch the filesystem.
    pub fn from_path(input: impl Into<PathBuf>, display: impl Into<String>) -> Self {
        let input = input.into();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            input,
            display: display.into(),
            output_key: stem.clone(),
            stem,
            dir,
            embedded_options: Vec::new(),
        }
    }

    /// Prefixes the output key with `qualifier`, e.g. `cloog-block`.
    pub fn with_qualifier(mut self, qualifier: &str) -> Self {
        if !qualifier.is_empty() {
            self.output_key = format!("{qualifier}-{}", self.output_key);
        }
        self
    }

    pub fn with_embedded_options(mut self, options: Vec<String>) -> Self {
        self.embedded_options = options;
        self
    }
}

/// Returns the whitespace-split tokens following the first `OPTIONS:`
/// marker in `content`, or an empty list when there is none.
pub fn extract_directive(content: &str) -> Vec<String> {
    OPTIONS_DIRECTIVE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Produces the ordered fixtures for `spec` from `corpus`.
///
/// Any missing directory or listed file is a configuration error raised
/// before a single fixture runs.
pub fn discover(spec: &KindSpec, corpus: &Path) -> Result<Vec<Fixture>, HarnessError> {
    if !corpus.is_dir() {
        return Err(HarnessError::configuration(format!(
            "test inputs directory not found at {}",
            corpus.display()
        )));
    }

    let mut fixtures = match spec.selection {
        Selection::Listed(names) => listed(corpus, names)?,
        Selection::Globbed(rules) => {
            let mut found = Vec::new();
            for rule in rules {
                found.extend(globbed(corpus, rule)?);
            }
            found
        }
    };

    disambiguate_output_keys(&mut fixtures);

    if spec.reads_directive {
        for fixture in &mut fixtures {
            let bytes = fs::read(&fixture.input).map_err(|e| HarnessError::io(&fixture.input, e))?;
            fixture.embedded_options = extract_directive(&String::from_utf8_lossy(&bytes));
        }
    }

    debug!(kind = %spec.kind, count = fixtures.len(), "discovered fixtures");
    Ok(fixtures)
}

/// Appends the input extension to keys still shared by several fixtures,
/// such as `dup.st` and `dup.in` in the same directory.
fn disambiguate_output_keys(fixtures: &mut [Fixture]) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for fixture in fixtures.iter() {
        *counts.entry(fixture.output_key.clone()).or_default() += 1;
    }
    for fixture in fixtures.iter_mut() {
        if counts[&fixture.output_key] < 2 {
            continue;
        }
        if let Some(ext) = fixture.input.extension() {
            fixture.output_key = format!("{}-{}", fixture.output_key, ext.to_string_lossy());
        }
    }
}

fn listed(corpus: &Path, names: &[&str]) -> Result<Vec<Fixture>, HarnessError> {
    names
        .iter()
        .map(|name| {
            let path = corpus.join(name);
            if !path.is_file() {
                return Err(HarnessError::configuration(format!(
                    "required fixture file not found: {}",
                    path.display()
                )));
            }
            Ok(Fixture::from_path(path, *name))
        })
        .collect()
}

fn globbed(corpus: &Path, rule: &GlobRule) -> Result<Vec<Fixture>, HarnessError> {
    let dir = corpus.join(rule.subdir);
    if !dir.is_dir() {
        return Err(HarnessError::configuration(format!(
            "fixture corpus subdirectory not found: {}",
            dir.display()
        )));
    }

    // `codegen/cloog` qualifies outputs with `cloog`; the kind's own root adds nothing.
    let qualifier = Path::new(rule.subdir)
        .components()
        .skip(1)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("-");

    let mut fixtures = Vec::new();
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            HarnessError::configuration(format!("failed to walk {}: {e}", dir.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == rule.extension) {
            fixtures.push(
                Fixture::from_path(path, path.display().to_string()).with_qualifier(&qualifier),
            );
        }
    }
    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{FailurePolicy, Oracle, ToolKind};

    static GLOBBED: KindSpec = KindSpec {
        kind: ToolKind::Schedule,
        tool: "isl_schedule",
        oracle: Oracle::Comparator("isl_schedule_cmp"),
        selection: Selection::Globbed(&[
            GlobRule {
                subdir: "schedule",
                extension: "sc",
            },
            GlobRule {
                subdir: "schedule/extra",
                extension: "sc",
            },
        ]),
        base_flags: &[],
        matrix: &[],
        output_ext: Some("st"),
        reads_directive: true,
        policy: FailurePolicy::Continue,
    };

    static LISTED: KindSpec = KindSpec {
        kind: ToolKind::Pip,
        tool: "isl_pip",
        oracle: Oracle::SelfTest,
        selection: Selection::Listed(&["zeta.pip", "alpha.pip"]),
        base_flags: &["-T"],
        matrix: &[],
        output_ext: None,
        reads_directive: false,
        policy: FailurePolicy::StopRun,
    };

    #[test]
    fn directive_is_first_match_split_on_whitespace() {
        let content = "# comment\n# OPTIONS: --schedule-outer-coincidence  --foo\nOPTIONS: --bar\n";
        assert_eq!(
            extract_directive(content),
            vec!["--schedule-outer-coincidence", "--foo"]
        );
    }

    #[test]
    fn absent_directive_is_empty_not_an_error() {
        assert!(extract_directive("domain: { S[i] }\n").is_empty());
        assert!(extract_directive("OPTIONS:\n").is_empty());
    }

    #[test]
    fn stem_and_directory_are_derived_from_the_input() {
        let fixture = Fixture::from_path("/src/test_inputs/codegen/cloog/block.st", "block");
        assert_eq!(fixture.stem, "block");
        assert_eq!(fixture.dir, PathBuf::from("/src/test_inputs/codegen/cloog"));
    }

    #[test]
    fn listed_fixtures_keep_declared_order() {
        let corpus = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("alpha.pip"), "").unwrap();
        fs::write(corpus.path().join("zeta.pip"), "").unwrap();

        let fixtures = discover(&LISTED, corpus.path()).unwrap();
        let names: Vec<_> = fixtures.iter().map(|f| f.display.as_str()).collect();
        assert_eq!(names, vec!["zeta.pip", "alpha.pip"]);
    }

    #[test]
    fn missing_listed_fixture_is_a_configuration_error() {
        let corpus = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("zeta.pip"), "").unwrap();

        let err = discover(&LISTED, corpus.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("alpha.pip"));
    }

    #[test]
    fn globbed_fixtures_are_sorted_per_rule_and_read_directives() {
        let corpus = tempfile::tempdir().unwrap();
        let schedule = corpus.path().join("schedule");
        let extra = schedule.join("extra");
        fs::create_dir_all(&extra).unwrap();
        fs::write(schedule.join("c.sc"), "").unwrap();
        fs::write(schedule.join("a.sc"), "# OPTIONS: --x\n").unwrap();
        fs::write(schedule.join("b.st"), "").unwrap();
        fs::write(extra.join("0.sc"), "").unwrap();

        let fixtures = discover(&GLOBBED, corpus.path()).unwrap();
        let stems: Vec<_> = fixtures.iter().map(|f| f.stem.as_str()).collect();
        assert_eq!(stems, vec!["a", "c", "0"]);
        assert_eq!(fixtures[0].embedded_options, vec!["--x"]);
        assert!(fixtures[1].embedded_options.is_empty());
    }

    #[test]
    fn same_stem_fixtures_get_distinct_output_keys() {
        let corpus = tempfile::tempdir().unwrap();
        let schedule = corpus.path().join("schedule");
        let extra = schedule.join("extra");
        fs::create_dir_all(&extra).unwrap();
        fs::write(schedule.join("dup.sc"), "").unwrap();
        fs::write(extra.join("dup.sc"), "").unwrap();

        let fixtures = discover(&GLOBBED, corpus.path()).unwrap();
        let keys: Vec<_> = fixtures.iter().map(|f| f.output_key.as_str()).collect();
        assert_eq!(keys, vec!["dup", "extra-dup"]);
        assert!(fixtures.iter().all(|f| f.stem == "dup"));
    }

    #[test]
    fn keys_shared_within_a_directory_take_the_input_extension() {
        let mut fixtures = vec![
            Fixture::from_path("codegen/dup.st", "codegen/dup.st"),
            Fixture::from_path("codegen/dup.in", "codegen/dup.in"),
            Fixture::from_path("codegen/solo.in", "codegen/solo.in"),
        ];
        disambiguate_output_keys(&mut fixtures);
        let keys: Vec<_> = fixtures.iter().map(|f| f.output_key.as_str()).collect();
        assert_eq!(keys, vec!["dup-st", "dup-in", "solo"]);
    }

    #[test]
    fn missing_glob_subdirectory_is_a_configuration_error() {
        let corpus = tempfile::tempdir().unwrap();
        fs::create_dir_all(corpus.path().join("schedule")).unwrap();

        let err = discover(&GLOBBED, corpus.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("extra"));
    }
}
