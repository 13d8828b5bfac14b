//! Pickle unpickler conformance harness.
//!
//! Checks that a foreign unpickler (Pyrolite's `net.razorvine.pickle.Unpickler`
//! by default) reconstructs every value of a curated corpus correctly, under
//! every pickle protocol from 0 to 5.
//!
//! # Usage
//!
//! ```bash
//! pyrolite-conformance --oracle java \
//!     --oracle-arg=-cp --oracle-arg=build/pyrolite.jar \
//!     --oracle-arg=net.razorvine.pickle.Unpickler
//! ```
//!
//! For each protocol and each case the harness writes the stream to
//! `pickledata.txt`, runs `<oracle> <stream> <report>` and expects two lines
//! in `resultdata.txt`: the Java type of the value and its string form.
//!
//! The binary exits with:
//! - 0: the run completed (with `--strict`, only if no case failed)
//! - 1: `--strict` and at least one case failed
//! - 2: the run could not be completed

pub mod adapter;
pub mod compare;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod hexdump;
pub mod oracle;
pub mod testcase;

pub use config::HarnessConfig;
pub use corpus::{CaseGroup, Corpus};
pub use driver::{Driver, RunSummary};
pub use error::HarnessError;
pub use oracle::{Invocation, Oracle, OracleReport, ProcessOracle};
pub use testcase::{CaseOutcome, InfraFailure, Mismatch, TestCase};
