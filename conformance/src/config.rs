//! Run configuration.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use pickle_ref::{HIGHEST_PROTOCOL, LOWEST_PROTOCOL};

use crate::error::HarnessError;

/// Name of the stream hand-off file inside the work directory.
pub const STREAM_FILE: &str = "pickledata.txt";
/// Name of the report hand-off file inside the work directory.
pub const REPORT_FILE: &str = "resultdata.txt";

/// What the driver needs to know besides the corpus and the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    work_dir: PathBuf,
    protocols: RangeInclusive<u8>,
    dump_failures: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            protocols: LOWEST_PROTOCOL..=HIGHEST_PROTOCOL,
            dump_failures: false,
        }
    }
}

impl HarnessConfig {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Restrict the run to `min..=max`.
    pub fn with_protocols(mut self, min: u8, max: u8) -> Result<Self, HarnessError> {
        if min > max || max > HIGHEST_PROTOCOL {
            return Err(HarnessError::ProtocolRange {
                min,
                max,
                lowest: LOWEST_PROTOCOL,
                highest: HIGHEST_PROTOCOL,
            });
        }
        self.protocols = min..=max;
        Ok(self)
    }

    /// Hex-dump the stream of every failing case.
    pub fn with_dump_failures(mut self, dump: bool) -> Self {
        self.dump_failures = dump;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn protocols(&self) -> RangeInclusive<u8> {
        self.protocols.clone()
    }

    pub fn dump_failures(&self) -> bool {
        self.dump_failures
    }

    pub fn stream_path(&self) -> PathBuf {
        self.work_dir.join(STREAM_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.work_dir.join(REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_protocol() {
        let config = HarnessConfig::default();
        assert_eq!(config.protocols(), 0..=5);
        assert_eq!(config.stream_path(), Path::new("./pickledata.txt"));
        assert_eq!(config.report_path(), Path::new("./resultdata.txt"));
        assert!(!config.dump_failures());
    }

    #[test]
    fn protocol_range_is_validated() {
        let narrowed = HarnessConfig::new("/tmp").with_protocols(2, 3).expect("valid");
        assert_eq!(narrowed.protocols(), 2..=3);
        assert!(HarnessConfig::default().with_protocols(4, 2).is_err());
        assert!(matches!(
            HarnessConfig::default().with_protocols(0, 6),
            Err(HarnessError::ProtocolRange { max: 6, highest: 5, .. })
        ));
    }
}
