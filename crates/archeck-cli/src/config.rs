//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use archeck_verify::config::DEFAULT_ENCRYPTION_MARKERS;

/// Global configuration for archeck
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub verifier: VerifierConfig,
    pub scan: ScanConfig,
    pub output: OutputConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub encryption_markers: Vec<String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        let program = if cfg!(windows) {
            r"C:\Program Files\7-Zip\7z.exe"
        } else {
            "7z"
        };
        Self {
            program: PathBuf::from(program),
            args: vec!["t".to_string(), "-p".to_string()],
            encryption_markers: DEFAULT_ENCRYPTION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Also verify `.exe` files (self-extracting archives).
    pub include_executables: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            default: 1,
            max: cpus.max(1),
        }
    }
}

impl WorkersConfig {
    /// Requested worker count (or the default) clamped to `1..=max`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        let max = self.max.max(1);
        requested.unwrap_or(self.default).clamp(1, max)
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./archeck.toml (current directory)
    /// 2. ~/.config/archeck/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("archeck.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "archeck") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
