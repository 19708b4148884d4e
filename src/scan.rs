//! Running the external disc scanner (BDInfo).
use crate::{config::ScannerSettings, types::Playlist, Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Host families the scanner can be launched on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Platform {
    /// Linux and macOS, launching the .NET executable through a runtime.
    Posix,
    /// Windows, running the executable natively.
    Windows,
    Other(&'static str),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &'static str) -> Self {
        match os {
            "linux" | "macos" => Platform::Posix,
            "windows" => Platform::Windows,
            other => Platform::Other(other),
        }
    }
}

/// Path a playlist's renamed scanner report is stored at.
pub fn report_path(work_dir: &Path, disc_index: usize, playlist: &Playlist) -> PathBuf {
    work_dir.join(format!(
        "Disc{}_{}_FULL.txt",
        disc_index + 1,
        playlist.number()
    ))
}

pub struct Scanner<'a> {
    settings: &'a ScannerSettings,
    work_dir: &'a Path,
    platform: Platform,
}

impl<'a> Scanner<'a> {
    pub fn new(settings: &'a ScannerSettings, work_dir: &'a Path) -> Self {
        Self::with_platform(settings, work_dir, Platform::current())
    }

    pub fn with_platform(
        settings: &'a ScannerSettings,
        work_dir: &'a Path,
        platform: Platform,
    ) -> Self {
        Scanner {
            settings,
            work_dir,
            platform,
        }
    }

    /// Builds the scanner invocation for one playlist.
    pub fn command(&self, disc: &Path, playlist: &Playlist) -> Result<Command> {
        let cmd = match self.platform {
            Platform::Posix => {
                let mut cmd = if self.settings.launcher.is_empty() {
                    Command::new(&self.settings.path)
                } else {
                    let mut cmd = Command::new(&self.settings.launcher);
                    cmd.arg(&self.settings.path);
                    cmd
                };
                cmd.arg(disc)
                    .arg("-m")
                    .arg(&playlist.file_name)
                    .arg(self.work_dir);
                cmd
            }
            Platform::Windows => {
                let mut cmd = Command::new(&self.settings.path);
                cmd.arg("-m")
                    .arg(&playlist.file_name)
                    .arg(disc)
                    .arg(self.work_dir);
                cmd
            }
            Platform::Other(os) => return Err(Error::UnsupportedPlatform(os.to_string())),
        };
        Ok(cmd)
    }

    /// Produces the full report for `playlist`, returning its path.
    ///
    /// A report left by an earlier run is reused as is. Otherwise the scanner
    /// runs to completion and its output file is moved to [`report_path`].
    /// The exit status is not interpreted; only the output file counts.
    pub async fn scan(
        &self,
        disc_index: usize,
        disc: &Path,
        playlist: &Playlist,
    ) -> Result<PathBuf> {
        let target = report_path(self.work_dir, disc_index, playlist);
        if target.exists() {
            info!("reusing existing report {}", target.display());
            return Ok(target);
        }

        let mut cmd = self.command(disc, playlist)?;
        info!(
            "scanning playlist {} ({})",
            playlist.file_name,
            crate::types::hms(playlist.duration_seconds)
        );
        let status = cmd.status().await?;
        debug!("scanner exited with {}", status);

        let output = self
            .find_output()?
            .ok_or_else(|| Error::ScanOutputMissing(playlist.file_name.clone()))?;
        tokio::fs::rename(&output, &target).await?;
        Ok(target)
    }

    // the scanner names its report after the disc, so it is found by prefix
    fn find_output(&self) -> Result<Option<PathBuf>> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(self.work_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&self.settings.report_prefix) && n.ends_with(".txt"))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        Ok(found.into_iter().next())
    }
}
