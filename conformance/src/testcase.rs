//! Test case metadata and per-case outcomes.

use std::fmt;
use std::time::Duration;

use pickle_ref::{Graph, NodeId};

/// One corpus entry: a value and what the unpickler must turn it into.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// The value, as a graph so that sharing and cycles are explicit.
    pub graph: Graph,
    pub root: NodeId,
    /// Fully qualified type the unpickler must report, e.g. `java.lang.Integer`.
    pub expected_label: String,
    /// Exact string rendering the unpickler must report.
    pub expected_string: String,
}

impl TestCase {
    /// Python `repr` of the value, for progress lines.
    pub fn describe(&self) -> String {
        self.graph.repr(self.root)
    }
}

/// A type or data disagreement between the oracle and the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Type { actual: String, expected: String },
    Data { actual: String, expected: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { actual, expected } => {
                write!(f, "TYPE ERROR, resultclass={actual} expected {expected}")
            }
            Self::Data { actual, expected } => {
                write!(f, "DATA ERROR, resultstr={actual:?} expected {expected:?}")
            }
        }
    }
}

/// The oracle did not produce a usable report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfraFailure {
    /// No report file existed after the oracle exited.
    NoReport,
    /// The report did not have exactly two lines.
    Malformed { lines: usize },
    /// The report was not valid UTF-8.
    NotUtf8,
    /// The oracle was still running when the bound expired and was killed.
    TimedOut { after: Duration },
}

impl fmt::Display for InfraFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReport => write!(f, "No outputfile. Skipping to next test."),
            Self::Malformed { lines } => {
                write!(f, "MALFORMED REPORT, expected 2 lines, got {lines}")
            }
            Self::NotUtf8 => write!(f, "MALFORMED REPORT, not valid UTF-8"),
            Self::TimedOut { after } => {
                write!(f, "TIMEOUT, oracle killed after {:.1}s", after.as_secs_f64())
            }
        }
    }
}

/// Result of running one case under one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Pass,
    /// Type and/or data disagreed; never empty.
    Mismatch(Vec<Mismatch>),
    Infrastructure(InfraFailure),
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Diagnostic lines, one per problem found.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::Pass => Vec::new(),
            Self::Mismatch(mismatches) => mismatches.iter().map(ToString::to_string).collect(),
            Self::Infrastructure(failure) => vec![failure.to_string()],
        }
    }
}
