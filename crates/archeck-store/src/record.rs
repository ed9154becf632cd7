//! Per-file verification record and its result state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verification state of one tracked file.
///
/// ```text
/// unchecked --exit 0--------------------> success
/// unchecked --exit != 0, marker---------> encrypted
/// unchecked --exit != 0-----------------> failure
/// any       --file removed--------------> deleted
/// deleted   --file reappears------------> unchecked
/// any       --mtime changed-------------> unchecked
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Unchecked,
    Success,
    Failure,
    Encrypted,
    Deleted,
}

impl CheckResult {
    pub const ALL: [CheckResult; 5] = [
        Self::Unchecked,
        Self::Success,
        Self::Failure,
        Self::Encrypted,
        Self::Deleted,
    ];

    /// Name used in the store file and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Encrypted => "encrypted",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }

    /// Outcome a verifier run can produce.
    pub fn is_verdict(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Encrypted)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored state for one path (the path itself is the map key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub result: CheckResult,
    /// Modification time in nanoseconds since the Unix epoch.
    ///
    /// A change fingerprint only, never compared for ordering.
    pub timestamp: i64,
    /// Fields written by newer versions, carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub fn unchecked(timestamp: i64) -> Self {
        Self {
            result: CheckResult::Unchecked,
            timestamp,
            extra: serde_json::Map::new(),
        }
    }

    pub fn needs_check(&self) -> bool {
        self.result == CheckResult::Unchecked
    }
}
