//! Harness configuration: executable resolution and the immutable run config.
//!
//! Everything here is evaluated once at startup. The resulting
//! [`HarnessConfig`] is passed by reference to the orchestrator; there is no
//! global state.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, trace};

use crate::errors::HarnessError;
use crate::kinds::ToolKind;

/// Directories probed, in order, when an executable is not found directly.
pub const FALLBACK_DIRS: [&str; 5] = ["build", "..", "../build", "build/bin", "../build/bin"];

/// Subdirectory of the source tree that holds every fixture.
pub const CORPUS_DIR: &str = "test_inputs";

// ============================================================================
// EXECUTABLE RESOLUTION
// ============================================================================

/// The directories consulted during resolution, captured once.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    /// Entries of `PATH`, in order.
    pub path_dirs: Vec<PathBuf>,
    /// Fallback build directories, relative to the working directory.
    pub fallback_dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Reads `PATH` from the environment and uses [`FALLBACK_DIRS`].
    pub fn from_env() -> Self {
        let path_dirs = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect())
            .unwrap_or_default();
        Self {
            path_dirs,
            fallback_dirs: FALLBACK_DIRS.iter().map(PathBuf::from).collect(),
        }
    }

    /// No `PATH` lookup, only the given fallback directories.
    pub fn fallback_only(dirs: &[&Path]) -> Self {
        Self {
            path_dirs: Vec::new(),
            fallback_dirs: dirs.iter().map(|d| d.to_path_buf()).collect(),
        }
    }
}

/// Resolves `declared` (or its override) to an executable path.
///
/// Probe order: the candidate itself when it contains a path separator,
/// otherwise every `PATH` directory and then the working directory; after
/// that each fallback directory joined with the declared name. Every probed
/// path is listed in the returned error.
pub fn resolve_executable(
    declared: &str,
    exeext: &str,
    override_path: Option<&Path>,
    search: &SearchPath,
) -> Result<PathBuf, HarnessError> {
    let candidate = with_extension_suffix(
        override_path.unwrap_or_else(|| Path::new(declared)),
        exeext,
    );
    let mut attempted = Vec::new();

    if has_separator(&candidate) {
        if probe(&candidate, &mut attempted) {
            return Ok(candidate);
        }
    } else {
        for dir in &search.path_dirs {
            let path = dir.join(&candidate);
            if probe(&path, &mut attempted) {
                return Ok(path);
            }
        }
        if probe(&candidate, &mut attempted) {
            return Ok(candidate);
        }
    }

    let file_name = format!("{declared}{exeext}");
    for dir in &search.fallback_dirs {
        let path = dir.join(&file_name);
        if probe(&path, &mut attempted) {
            debug!(executable = declared, path = %path.display(), "found in fallback directory");
            return Ok(path);
        }
    }

    Err(HarnessError::launch(
        candidate.display().to_string(),
        "no executable found",
        attempted,
    )
    .with_help(format!(
        "make sure the ISL project is built and pass the correct path with --{}",
        declared.replace('_', "-")
    )))
}

fn with_extension_suffix(path: &Path, exeext: &str) -> PathBuf {
    if exeext.is_empty() {
        return path.to_path_buf();
    }
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(exeext);
    PathBuf::from(name)
}

fn has_separator(path: &Path) -> bool {
    path.components().count() > 1 || path.is_absolute()
}

fn probe(path: &Path, attempted: &mut Vec<PathBuf>) -> bool {
    trace!(path = %path.display(), "probing for executable");
    attempted.push(path.to_path_buf());
    is_executable(path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ============================================================================
// HARNESS CONFIG
// ============================================================================

/// Resolved, validated configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub srcdir: PathBuf,
    /// Resolved executables keyed by declared name.
    pub executables: BTreeMap<String, PathBuf>,
    /// Differ argv prefix; reference and output paths are appended.
    pub differ: Vec<String>,
    /// Where temporary `test-*` outputs are written.
    pub output_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl HarnessConfig {
    /// Validates `srcdir` and starts a config with the default differ.
    ///
    /// Fails with a configuration error when the source tree or its
    /// `test_inputs` directory is missing; nothing is launched before that.
    pub fn new(srcdir: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let srcdir = srcdir.into();
        if !srcdir.is_dir() {
            return Err(HarnessError::configuration(format!(
                "source directory not found at {}",
                srcdir.display()
            ))
            .with_help("make sure --srcdir points to the ISL source directory"));
        }
        let corpus = srcdir.join(CORPUS_DIR);
        if !corpus.is_dir() {
            return Err(HarnessError::configuration(format!(
                "test inputs directory not found at {}",
                corpus.display()
            ))
            .with_help("make sure --srcdir points to the ISL source directory"));
        }
        Ok(Self {
            srcdir,
            executables: BTreeMap::new(),
            differ: vec!["diff".to_string()],
            output_dir: PathBuf::from("."),
            timeout: None,
        })
    }

    /// Resolves every executable the given kinds need.
    pub fn resolve_for(
        mut self,
        kinds: &[ToolKind],
        exeext: &str,
        overrides: &BTreeMap<String, PathBuf>,
        search: &SearchPath,
    ) -> Result<Self, HarnessError> {
        for kind in kinds {
            for name in kind.spec().executables() {
                if self.executables.contains_key(name) {
                    continue;
                }
                let path = resolve_executable(
                    name,
                    exeext,
                    overrides.get(name).map(PathBuf::as_path),
                    search,
                )?;
                debug!(executable = name, path = %path.display(), "resolved");
                self.executables.insert(name.to_string(), path);
            }
        }
        Ok(self)
    }

    pub fn with_executable(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.executables.insert(name.to_string(), path.into());
        self
    }

    /// Sets the differ from a shell-like command line such as
    /// `"cmake -E compare_files"`. Surrounding double quotes are stripped.
    pub fn with_differ_command(mut self, command: &str) -> Result<Self, HarnessError> {
        self.differ = parse_differ(command)?;
        Ok(self)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.srcdir.join(CORPUS_DIR)
    }

    /// Looks up a resolved executable by declared name.
    pub fn executable(&self, name: &str) -> Result<&Path, HarnessError> {
        self.executables
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                HarnessError::launch(name, "executable was never resolved", Vec::new())
            })
    }
}

/// Tokenizes a differ command line with shell word splitting.
pub fn parse_differ(command: &str) -> Result<Vec<String>, HarnessError> {
    let trimmed = command.trim().trim_matches('"');
    let words = shell_words::split(trimmed).map_err(|e| {
        HarnessError::configuration(format!("cannot parse --diff command `{command}`: {e}"))
    })?;
    if words.is_empty() {
        return Err(HarnessError::configuration("--diff command is empty"));
    }
    Ok(words)
}
