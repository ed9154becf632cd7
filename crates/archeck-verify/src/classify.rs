//! Which filesystem entries are verification candidates

use std::path::Path;

/// Archive extensions always scanned (compared case-insensitively).
pub const ARCHIVE_EXTENSIONS: [&str; 4] = ["zip", "7z", "001", "rar"];

/// Decides whether a path is handed to the verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    include_executables: bool,
}

impl Classifier {
    pub fn new(include_executables: bool) -> Self {
        Self {
            include_executables,
        }
    }

    /// Extension-based check, with later RAR volumes filtered out.
    pub fn is_candidate(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        let accepted = ARCHIVE_EXTENSIONS.contains(&ext.as_str())
            || (self.include_executables && ext == "exe");
        if !accepted {
            return false;
        }
        if ext == "rar" {
            return path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, is_first_volume);
        }
        true
    }
}

/// Whether a RAR file name is the first part of a multi-volume set.
///
/// `name.part1.rar`, `name.part01.rar` and `name.PART001.RAR` are first
/// volumes; `name.part2.rar` is not. Names without a `partN` suffix are
/// single archives, and part numbers too large to parse count as first
/// volumes so no file is silently dropped.
pub fn is_first_volume(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    let Some(stem) = lower.strip_suffix(".rar") else {
        return true;
    };
    let digits_at = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let (head, digits) = stem.split_at(digits_at);
    if digits.is_empty() || !head.ends_with("part") {
        return true;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        // part0 / part000
        return false;
    }
    trimmed.parse::<u64>().map_or(true, |n| n == 1)
}
