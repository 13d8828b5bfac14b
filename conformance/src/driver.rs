//! The protocol driver.
//!
//! For every protocol, every group and every case: serialize, invoke the
//! oracle, compare, tally. Case failures are counted and the run continues;
//! only [`HarnessError`]s stop it.

use std::io::Write;
use std::path::{Path, PathBuf};

use facet::Facet;

use crate::adapter;
use crate::compare;
use crate::config::HarnessConfig;
use crate::corpus::Corpus;
use crate::error::HarnessError;
use crate::hexdump::hexdump;
use crate::oracle::{Invocation, Oracle};
use crate::testcase::{CaseOutcome, TestCase};

/// Errors and attempts for one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct ProtocolTally {
    pub protocol: u8,
    pub attempted: u64,
    pub errors: u64,
}

/// One failing case.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct FailureRecord {
    pub protocol: u8,
    pub group: String,
    pub value: String,
    pub diagnostics: Vec<String>,
}

/// Everything a finished run has to say.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct RunSummary {
    pub protocols: Vec<ProtocolTally>,
    pub failures: Vec<FailureRecord>,
    pub total_errors: u64,
}

impl RunSummary {
    pub fn attempted(&self) -> u64 {
        self.protocols.iter().map(|t| t.attempted).sum()
    }

    pub fn passed(&self) -> bool {
        self.total_errors == 0
    }
}

/// Removes both hand-off files when dropped, including on early return.
struct HandOff {
    stream: PathBuf,
    report: PathBuf,
}

impl Drop for HandOff {
    fn drop(&mut self) {
        for path in [&self.stream, &self.report] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed hand-off file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot remove hand-off file"
                ),
            }
        }
    }
}

pub struct Driver<O> {
    config: HarnessConfig,
    oracle: O,
}

impl<O: Oracle> Driver<O> {
    pub fn new(config: HarnessConfig, oracle: O) -> Self {
        Self { config, oracle }
    }

    /// Run the whole corpus under every configured protocol, writing the
    /// transcript to `out`.
    pub fn run<W: Write>(
        &mut self,
        corpus: &Corpus,
        out: &mut W,
    ) -> Result<RunSummary, HarnessError> {
        let handoff = HandOff {
            stream: self.config.stream_path(),
            report: self.config.report_path(),
        };

        let mut summary = RunSummary {
            protocols: Vec::new(),
            failures: Vec::new(),
            total_errors: 0,
        };

        for protocol in self.config.protocols() {
            let span = tracing::info_span!("protocol", protocol);
            let _enter = span.enter();

            writeln!(out).map_err(HarnessError::Report)?;
            writeln!(out, "PICKLE PROTOCOL: {protocol}").map_err(HarnessError::Report)?;

            let mut tally = ProtocolTally {
                protocol,
                attempted: 0,
                errors: 0,
            };
            for group in corpus.groups() {
                writeln!(out, "CHECK CLASS: {}", group.label).map_err(HarnessError::Report)?;
                for case in &group.cases {
                    tally.attempted += 1;
                    let value = case.describe();
                    writeln!(out, "testing {value}").map_err(HarnessError::Report)?;

                    let (outcome, stream) =
                        self.run_case(case, protocol, &handoff.stream, &handoff.report)?;
                    if outcome.passed() {
                        continue;
                    }

                    tally.errors += 1;
                    let diagnostics = outcome.diagnostics();
                    for line in &diagnostics {
                        writeln!(out, "  {line}").map_err(HarnessError::Report)?;
                    }
                    if self.config.dump_failures() {
                        for line in hexdump(&stream).lines() {
                            writeln!(out, "    {line}").map_err(HarnessError::Report)?;
                        }
                    }
                    summary.failures.push(FailureRecord {
                        protocol,
                        group: group.label.clone(),
                        value,
                        diagnostics,
                    });
                }
            }

            writeln!(out, "number of errors for protocol {protocol}: {}", tally.errors)
                .map_err(HarnessError::Report)?;
            tracing::info!(attempted = tally.attempted, errors = tally.errors, "protocol done");
            summary.total_errors += tally.errors;
            summary.protocols.push(tally);
        }

        writeln!(out).map_err(HarnessError::Report)?;
        writeln!(out, "Total number of errors: {}", summary.total_errors)
            .map_err(HarnessError::Report)?;

        drop(handoff);
        Ok(summary)
    }

    fn run_case(
        &mut self,
        case: &TestCase,
        protocol: u8,
        stream_path: &Path,
        report_path: &Path,
    ) -> Result<(CaseOutcome, Vec<u8>), HarnessError> {
        let stream = adapter::serialize(case, protocol, stream_path)?;
        let outcome = match self.oracle.invoke(stream_path, report_path)? {
            Invocation::Report(report) => compare::compare(&report, case),
            Invocation::Failed(failure) => CaseOutcome::Infrastructure(failure),
        };
        tracing::debug!(label = %case.expected_label, ?outcome, "case finished");
        Ok((outcome, stream))
    }
}
