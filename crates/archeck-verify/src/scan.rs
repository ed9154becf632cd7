//! Recursive directory scan producing the physical snapshot

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use archeck_store::Snapshot;

use crate::classify::Classifier;

/// Modification time in nanoseconds since the epoch (negative before it).
pub fn mtime_ns(meta: &Metadata) -> i64 {
    let Ok(modified) = meta.modified() else {
        return 0;
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}

/// Walk `root` recursively and return every candidate file with its mtime.
///
/// `root` must already be canonical. Paths are canonicalized so that
/// symlinked duplicates collapse to one key; anything resolving outside
/// `root` (reached through a symlinked directory) is not tracked.
/// Unreadable entries and non-UTF-8 paths are logged and skipped; the scan
/// itself never writes.
pub fn scan(root: &Path, classifier: &Classifier) -> Result<Snapshot, glob::PatternError> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = Path::new(&escaped).join("**").join("*");
    let pattern_str = pattern.to_string_lossy();

    let mut found = Snapshot::new();
    for entry in glob::glob(&pattern_str)? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !classifier.is_candidate(&path) {
            continue;
        }
        let meta = match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("Cannot stat {}: {e}", path.display());
                continue;
            }
        };
        let resolved = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Cannot resolve {}: {e}", path.display());
                continue;
            }
        };
        if !resolved.starts_with(root) {
            log::debug!("Skipping {} outside {}", path.display(), root.display());
            continue;
        }
        let Some(key) = resolved.to_str() else {
            log::warn!("Skipping non-UTF-8 path {}", resolved.display());
            continue;
        };
        found.insert(key.to_string(), mtime_ns(&meta));
    }

    log::debug!("{} candidates under {}", found.len(), root.display());
    Ok(found)
}
