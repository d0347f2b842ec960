//! Transfer ids: millisecond timestamp prefix plus a random suffix.
//!
//! Ids correlate events with UI rows; they are not a security boundary, so a
//! collision is merely improbable rather than impossible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use super::unix_millis;

const SUFFIX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    /// New process-unique id, e.g. `"18f3a2b4c5d-k3J9xQ2a"`.
    pub fn generate() -> Self {
        let prefix = unix_millis(SystemTime::now());
        let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(SUFFIX_LEN)
            .collect();
        Self(format!("{prefix:x}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransferId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
