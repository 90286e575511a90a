//! Synchronous subprocess execution with fully redirected I/O.
//!
//! Stdin is always the fixture file, opened read-only. Stdout goes either to
//! the invocation's output file or, merged with stderr, to an anonymous
//! temporary file. Stderr always lands in an anonymous temporary file rather
//! than a pipe, so a chatty tool can never block on a full pipe while the
//! harness waits for it. Every handle is closed before [`run`] returns.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::errors::HarnessError;
use crate::invocation::{Invocation, StdoutTarget};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "how", rename_all = "snake_case")]
pub enum Termination {
    Exited { code: i32 },
    /// Killed by a signal; the number is unknown on some platforms.
    Signaled { signal: Option<i32> },
    /// Killed by the harness after the configured timeout.
    TimedOut { after_ms: u64 },
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited { code: 0 })
    }

    fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited { code };
        }
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;
        Termination::Signaled { signal }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Exited { code } => write!(f, "exit status {code}"),
            Termination::Signaled { signal: Some(sig) } => write!(f, "killed by signal {sig}"),
            Termination::Signaled { signal: None } => write!(f, "killed by a signal"),
            Termination::TimedOut { after_ms } => write!(f, "timed out after {after_ms} ms"),
        }
    }
}

/// What the harness learned from one finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub termination: Termination,
    /// Stdout merged with stderr, for in-memory captures only.
    pub captured: Option<String>,
    /// Stderr text; empty for merged captures.
    pub stderr: String,
}

impl ExecutionResult {
    /// Text to show the user when the tool failed.
    pub fn diagnostic_text(&self) -> &str {
        self.captured.as_deref().unwrap_or(&self.stderr)
    }
}

/// Runs `invocation` to completion, or until `timeout` elapses.
///
/// A non-zero exit or a signal is data, not an error. Only failing to
/// prepare the redirections or to start the process is reported as `Err`.
pub fn run(
    invocation: &Invocation,
    timeout: Option<Duration>,
) -> Result<ExecutionResult, HarnessError> {
    debug!(
        program = %invocation.program.display(),
        args = ?invocation.args,
        stdin = %invocation.stdin.display(),
        stdout = ?invocation.stdout,
        "running tool"
    );

    let stdin = File::open(&invocation.stdin).map_err(|e| HarnessError::io(&invocation.stdin, e))?;
    let mut err_sink = anonymous_file()?;
    let (stdout, merged) = match &invocation.stdout {
        StdoutTarget::File(path) => {
            let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
            (Stdio::from(file), false)
        }
        StdoutTarget::Capture => {
            let dup = err_sink
                .try_clone()
                .map_err(|e| HarnessError::io("<capture>", e))?;
            (Stdio::from(dup), true)
        }
    };
    let stderr = err_sink
        .try_clone()
        .map_err(|e| HarnessError::io("<capture>", e))?;

    let child = spawn(
        &invocation.program,
        &invocation.args,
        Stdio::from(stdin),
        stdout,
        Stdio::from(stderr),
    )?;
    let termination = wait(child, timeout, &invocation.program)?;

    let text = read_back(&mut err_sink)?;
    let (captured, stderr) = if merged {
        (Some(text), String::new())
    } else {
        (None, text)
    };
    Ok(ExecutionResult {
        termination,
        captured,
        stderr,
    })
}

/// Runs an auxiliary command (differ or comparator) with no stdin and both
/// output streams captured.
pub fn run_captured(program: &Path, args: &[String]) -> Result<(Termination, String), HarnessError> {
    debug!(program = %program.display(), args = ?args, "running comparator");
    let mut out_sink = anonymous_file()?;
    let mut err_sink = anonymous_file()?;
    let stdout = out_sink
        .try_clone()
        .map_err(|e| HarnessError::io("<capture>", e))?;
    let stderr = err_sink
        .try_clone()
        .map_err(|e| HarnessError::io("<capture>", e))?;

    let child = spawn(
        program,
        args,
        Stdio::null(),
        Stdio::from(stdout),
        Stdio::from(stderr),
    )?;
    let termination = wait(child, None, program)?;

    let mut text = read_back(&mut out_sink)?;
    let err_text = read_back(&mut err_sink)?;
    if !text.is_empty() && !err_text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&err_text);
    Ok((termination, text))
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

/// Spawns the child. The `Command`, and with it every parent-side copy of
/// the redirected handles, is dropped before this returns.
fn spawn(
    program: &Path,
    args: &[String],
    stdin: Stdio,
    stdout: Stdio,
    stderr: Stdio,
) -> Result<Child, HarnessError> {
    Command::new(program)
        .args(args)
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| {
            HarnessError::launch(
                program.display().to_string(),
                e.to_string(),
                vec![program.to_path_buf()],
            )
        })
}

fn wait(
    mut child: Child,
    timeout: Option<Duration>,
    program: &Path,
) -> Result<Termination, HarnessError> {
    let wait_error = |e: std::io::Error| {
        HarnessError::launch(
            program.display().to_string(),
            format!("failed to wait for process: {e}"),
            Vec::new(),
        )
    };

    let Some(limit) = timeout else {
        return child.wait().map(Termination::from_status).map_err(wait_error);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            return Ok(Termination::from_status(status));
        }
        if start.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Termination::TimedOut {
                after_ms: saturating_millis(limit),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn anonymous_file() -> Result<File, HarnessError> {
    tempfile::tempfile().map_err(|e| HarnessError::io(std::env::temp_dir(), e))
}

fn read_back(file: &mut File) -> Result<String, HarnessError> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| HarnessError::io("<capture>", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
