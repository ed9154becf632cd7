//! Blake3 hashing for deterministic store file names

use std::path::Path;

/// Return the first 8 hex characters of a blake3 hash.
pub fn short_hash(hash: &blake3::Hash) -> String {
    hash.to_hex()[..8].to_string()
}

/// Short hash identifying the store of a canonical directory path.
///
/// Hashes the UTF-8 (lossy) bytes of the path exactly as given; callers
/// canonicalize first so that `./x` and `/abs/x` share one store.
pub fn dir_hash(canonical_dir: &Path) -> String {
    let s = canonical_dir.to_string_lossy();
    short_hash(&blake3::hash(s.as_bytes()))
}

/// `result_<hash8>.json`
pub fn store_file_name(canonical_dir: &Path) -> String {
    format!("result_{}.json", dir_hash(canonical_dir))
}
