//! islcheck Error Handling
//!
//! Only environment-level failures are errors here. A tool that exits non-zero
//! or output that does not match its reference is ordinary data and lives in
//! [`crate::compare::Outcome`], never in [`HarnessError`].

use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// ERROR KINDS
// ============================================================================

/// What went wrong. Every variant is fatal for the run that produced it.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Missing source directory, corpus subdirectory or listed fixture file.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// An executable could not be found or could not be started.
    #[error("could not launch `{program}`: {reason}")]
    Launch {
        program: String,
        reason: String,
        attempted: Vec<PathBuf>,
    },

    /// Unexpected filesystem failure while preparing outputs or writing reports.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ErrorKind {
    fn code_suffix(&self) -> &'static str {
        match self {
            ErrorKind::Configuration { .. } => "configuration",
            ErrorKind::Launch { .. } => "launch",
            ErrorKind::Io { .. } => "io",
        }
    }
}

// ============================================================================
// HARNESS ERROR
// ============================================================================

/// The single error type surfaced by the harness.
#[derive(Debug)]
pub struct HarnessError {
    pub kind: ErrorKind,
    pub help: Option<String>,
}

impl HarnessError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Configuration {
                message: message.into(),
            },
            help: None,
        }
    }

    pub fn launch(
        program: impl Into<String>,
        reason: impl Into<String>,
        attempted: Vec<PathBuf>,
    ) -> Self {
        Self {
            kind: ErrorKind::Launch {
                program: program.into(),
                reason: reason.into(),
                attempted,
            },
            help: None,
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io {
                path: path.as_ref().to_path_buf(),
                source,
            },
            help: None,
        }
    }

    /// Attaches a help line rendered under the diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration { .. })
    }

    pub fn is_launch(&self) -> bool {
        matches!(self.kind, ErrorKind::Launch { .. })
    }

    /// Paths probed before a launch failure; empty for other kinds.
    pub fn attempted_paths(&self) -> &[PathBuf] {
        match &self.kind {
            ErrorKind::Launch { attempted, .. } => attempted,
            _ => &[],
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let ErrorKind::Launch { attempted, .. } = &self.kind {
            if !attempted.is_empty() {
                write!(f, " (tried: ")?;
                for (i, path) in attempted.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                write!(f, ")")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("islcheck::{}", self.kind.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a HarnessError with full miette diagnostics on stderr.
pub fn print_error(error: HarnessError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
