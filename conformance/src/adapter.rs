//! Serialization adapter: one case, one protocol, one stream file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::HarnessError;
use crate::testcase::TestCase;

/// Encode `case` with `protocol` and write it to `path`, replacing whatever
/// was there. The file is flushed and closed before this returns.
///
/// Returns the encoded bytes so failures can be dumped.
pub fn serialize(case: &TestCase, protocol: u8, path: &Path) -> Result<Vec<u8>, HarnessError> {
    let stream = pickle_ref::to_vec(&case.graph, case.root, protocol).map_err(|source| {
        HarnessError::Encode {
            case: case.describe(),
            protocol,
            source,
        }
    })?;

    let mut file = File::create(path).map_err(HarnessError::io(path))?;
    file.write_all(&stream).map_err(HarnessError::io(path))?;
    file.flush().map_err(HarnessError::io(path))?;

    tracing::debug!(path = %path.display(), protocol, bytes = stream.len(), "wrote stream");
    Ok(stream)
}
