//! Running the foreign unpickler and reading its report.
//!
//! The oracle contract is `<oracle> [args...] <streamPath> <reportPath>`. The
//! oracle reads the stream, reconstructs the value and writes two UTF-8
//! lines to the report path: the runtime type of the value (Java prints it as
//! `class a.b.C`) and its string rendering. The exit status is logged but
//! never used to classify a case: only the report counts.

use std::ffi::OsString;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use std::{fs, str};

use wait_timeout::ChildExt;

use crate::error::HarnessError;
use crate::testcase::InfraFailure;

/// The two lines an oracle writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReport {
    pub type_line: String,
    pub string_line: String,
}

/// Outcome of one oracle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Report(OracleReport),
    Failed(InfraFailure),
}

/// Something that turns a stream file into a report.
///
/// [`ProcessOracle`] is the real thing. Tests substitute in-process fakes
/// that produce the same observable results.
pub trait Oracle {
    fn invoke(&mut self, stream: &Path, report: &Path) -> Result<Invocation, HarnessError>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn invoke(&mut self, stream: &Path, report: &Path) -> Result<Invocation, HarnessError> {
        (**self).invoke(stream, report)
    }
}

/// Split report text into its two lines.
///
/// A trailing newline is allowed; anything other than exactly two lines is
/// reported back as the line count.
pub fn parse_report(text: &str) -> Result<OracleReport, usize> {
    let lines: Vec<&str> = text.lines().collect();
    match lines.as_slice() {
        [type_line, string_line] => Ok(OracleReport {
            type_line: (*type_line).to_owned(),
            string_line: (*string_line).to_owned(),
        }),
        other => Err(other.len()),
    }
}

/// Read and classify the report at `path`.
pub fn read_report(path: &Path) -> Result<Invocation, HarnessError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Invocation::Failed(InfraFailure::NoReport));
        }
        Err(e) => return Err(HarnessError::io(path)(e)),
    };
    let Ok(text) = str::from_utf8(&raw) else {
        return Ok(Invocation::Failed(InfraFailure::NotUtf8));
    };
    Ok(match parse_report(text) {
        Ok(report) => Invocation::Report(report),
        Err(lines) => Invocation::Failed(InfraFailure::Malformed { lines }),
    })
}

/// Delete `path` if it exists.
pub fn remove_stale(path: &Path) -> Result<(), HarnessError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarnessError::io(path)(e)),
    }
}

/// Runs the oracle as a child process, one process per case.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
}

impl ProcessOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Arguments placed before the two paths, e.g. `-cp pyrolite.jar Main`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the child if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Oracle for ProcessOracle {
    fn invoke(&mut self, stream: &Path, report: &Path) -> Result<Invocation, HarnessError> {
        remove_stale(report)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(stream)
            .arg(report)
            .stdin(Stdio::null())
            // Keep our stdout for the run transcript.
            .stdout(Stdio::from(io::stderr()));

        tracing::debug!(?command, "spawning oracle");
        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let status = match self.timeout {
            None => child.wait().map_err(HarnessError::io(&self.program))?,
            Some(limit) => match child
                .wait_timeout(limit)
                .map_err(HarnessError::io(&self.program))?
            {
                Some(status) => status,
                None => {
                    tracing::warn!(
                        program = %self.program.display(),
                        timeout = ?limit,
                        "oracle timed out, killing it"
                    );
                    // The child may exit between the timeout and the kill.
                    let _ = child.kill();
                    child.wait().map_err(HarnessError::io(&self.program))?;
                    return Ok(Invocation::Failed(InfraFailure::TimedOut { after: limit }));
                }
            },
        };

        if status.success() {
            tracing::debug!(%status, "oracle exited");
        } else {
            tracing::warn!(
                %status,
                program = %self.program.display(),
                "oracle exited unsuccessfully"
            );
        }

        read_report(report)
    }
}
