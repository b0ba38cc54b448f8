//! Archive checksum verification

use crate::error::{NetworkErrorKind, StageError, StageResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::debug;

/// SHA-256 of a file's contents as lowercase hex
pub fn sha256_file(path: &Path) -> StageResult<String> {
    let file = File::open(path)
        .map_err(|e| StageError::filesystem("opening archive for hashing", path, e))?;
    let mut reader = BufReader::new(file);

    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)
        .map_err(|e| StageError::filesystem("hashing archive", path, e))?;

    Ok(hex::encode(hasher.finalize()))
}

/// Compare a downloaded archive against its declared checksum.
///
/// A mismatch is reported as a network failure for `url`.
pub fn verify_sha256(path: &Path, expected: &str, url: &str) -> StageResult<()> {
    let actual = sha256_file(path)?;
    if actual != expected {
        return Err(StageError::network(
            url,
            NetworkErrorKind::IntegrityMismatch {
                expected: expected.to_string(),
                actual,
            },
        ));
    }
    debug!("Checksum verified for {}", path.display());
    Ok(())
}
