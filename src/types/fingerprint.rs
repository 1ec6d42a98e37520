// ABOUTME: Content hash of an instance's run-argument vector.
// ABOUTME: Recorded as a label at launch and compared to detect configuration drift.

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 over the run arguments, each terminated by a NUL byte.
///
/// The terminator keeps `["a b"]` and `["a", "b"]` apart. Arguments handed to
/// a process can never contain NUL themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunFingerprint(String);

impl RunFingerprint {
    pub fn of<S: AsRef<str>>(args: &[S]) -> Self {
        let mut hasher = Sha256::new();
        for arg in args {
            hasher.update(arg.as_ref().as_bytes());
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }

    /// Whether a label value read back from the runtime matches.
    pub fn matches(&self, recorded: &str) -> bool {
        self.0 == recorded.trim()
    }
}

impl fmt::Display for RunFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
