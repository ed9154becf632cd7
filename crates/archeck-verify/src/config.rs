use std::path::PathBuf;

/// Case-insensitive substrings that mark a failed run as an encrypted archive.
pub const DEFAULT_ENCRYPTION_MARKERS: [&str; 2] = ["password", "encrypted"];

/// Resolved parameters for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target_dir: PathBuf,
    /// Directory holding the store file.
    pub output_dir: PathBuf,
    pub include_executables: bool,
    pub workers: usize,
    pub encryption_markers: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            include_executables: false,
            workers: 1,
            encryption_markers: DEFAULT_ENCRYPTION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl RunConfig {
    /// Markers lowercased for matching against lowercased transcripts.
    pub fn normalized_markers(&self) -> Vec<String> {
        self.encryption_markers
            .iter()
            .map(|m| m.to_lowercase())
            .filter(|m| !m.is_empty())
            .collect()
    }
}
