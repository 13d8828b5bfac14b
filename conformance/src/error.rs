//! Errors that stop a run.
//!
//! Anything that only affects one case (missing report, malformed report,
//! timeout, mismatches) is a [`crate::testcase::CaseOutcome`], not an error.

use std::io;
use std::path::PathBuf;

use pickle_ref::PickleError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The encoder rejected a corpus value. This is a corpus or encoder bug.
    #[error("cannot encode {case} with protocol {protocol}: {source}")]
    Encode {
        case: String,
        protocol: u8,
        #[source]
        source: PickleError,
    },

    /// A hand-off file could not be written, read or removed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The oracle process could not be started at all.
    #[error("failed to launch oracle {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A corpus literal is not a valid value (e.g. an impossible date).
    #[error("invalid corpus literal: {0}")]
    Corpus(&'static str),

    /// The requested protocol range is empty or beyond the encoder.
    #[error("invalid protocol range {min}..={max} (encoder supports {lowest}..={highest})")]
    ProtocolRange {
        min: u8,
        max: u8,
        lowest: u8,
        highest: u8,
    },

    /// A `--group` filter named a group the corpus does not have.
    #[error("unknown corpus group {0:?}")]
    UnknownGroup(String),

    /// No oracle was configured for a run.
    #[error("no oracle configured; pass --oracle or set PYROLITE_ORACLE")]
    MissingOracle,

    /// Writing the console report failed.
    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
