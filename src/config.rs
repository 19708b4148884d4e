//! Configuration
//!
//! Loaded once from a TOML file and handed to [`DiscParser`] by value. Every
//! section and key is optional; missing values fall back to the defaults
//! below.
//!
//! [`DiscParser`]: ../pipeline/struct.DiscParser.html
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scanner: ScannerSettings,
    pub selection: SelectionSettings,
    pub retry: RetryPolicy,
    pub paths: PathSettings,
    pub mediainfo: MediaInfoSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Path to the BDInfo executable.
    pub path: PathBuf,
    /// Runtime used to launch the executable on POSIX hosts.
    pub launcher: String,
    /// File name prefix of the report the scanner writes.
    pub report_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Always scan only the playlist with the largest total clip size.
    pub use_largest_playlist: bool,
    /// Run without prompting.
    pub unattended: bool,
    /// Prompt anyway when running unattended.
    pub unattended_confirm: bool,
}

/// Bounded retry for re-reading a report that failed to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    pub delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Where scanner reports and summaries are written.
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfoSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("bin/BDInfo/BDInfo.exe"),
            launcher: "mono".to_string(),
            report_prefix: "BDINFO".to_string(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Attempts to make, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("tmp"),
        }
    }
}

impl Default for MediaInfoSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mediainfo"),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SelectionSettings {
    /// Whether the user is asked to pick playlists and edition names.
    pub fn is_interactive(&self) -> bool {
        !self.unattended || self.unattended_confirm
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
