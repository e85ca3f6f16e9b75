//! Render-equivalence digest over a diff result.
//!
//! Two results with equal fingerprints are treated as identical for
//! rendering. Only `(path, status, additions, deletions)` per file feeds the
//! digest, so a hunk rewritten in place with the same line counts is not
//! detected. Refreshes accept that miss in exchange for not hashing file
//! contents on every poll.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::model::FileDiff;

const FIELD_SEP: &[u8] = b"\x1f";
const RECORD_SEP: &[u8] = b"\x1e";

/// Hex-encoded SHA-256 over the file metadata of one result, in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(files: &[FileDiff]) -> Self {
        let mut hasher = Sha256::new();
        for file in files {
            hasher.update(file.path.as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(file.status.to_string().as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(file.additions.to_string().as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(file.deletions.to_string().as_bytes());
            hasher.update(RECORD_SEP);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}
