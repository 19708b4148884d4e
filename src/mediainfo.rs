//! Media information for DVD and HD-DVD files.
//!
//! The crate only needs two things from a media-info service: the tracks of a
//! file as field/value maps, and the usual human readable report. Both come
//! through [`MediaInfoSource`]; [`MediaInfoCli`] implements it on top of the
//! `mediainfo` command line tool.
use crate::{config::MediaInfoSettings, Error, Result};
use serde_json::{Map, Value};
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tokio::process::Command;

/// The fields of one track, as reported by the service.
pub type Track = Map<String, Value>;

pub trait MediaInfoSource {
    /// Tracks of `path`, general track first.
    fn tracks(&self, path: &Path) -> impl Future<Output = Result<Vec<Track>>> + Send;

    /// Text report of `path`, with `\n` line endings.
    fn text_report(&self, path: &Path) -> impl Future<Output = Result<String>> + Send;
}

/// Runs the `mediainfo` executable.
#[derive(Debug, Clone)]
pub struct MediaInfoCli {
    program: PathBuf,
}

impl MediaInfoCli {
    pub fn new(settings: &MediaInfoSettings) -> Self {
        MediaInfoCli {
            program: settings.path.clone(),
        }
    }

    async fn run(&self, args: &[&str], path: &Path) -> Result<String> {
        let output = Command::new(&self.program).args(args).arg(path).output().await?;
        if !output.status.success() {
            return Err(Error::MediaInfo(format!(
                "{} failed for {}: {}",
                self.program.display(),
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).replace("\r\n", "\n"))
    }
}

impl MediaInfoSource for MediaInfoCli {
    async fn tracks(&self, path: &Path) -> Result<Vec<Track>> {
        parse_tracks(&self.run(&["--Output=JSON"], path).await?)
    }

    async fn text_report(&self, path: &Path) -> Result<String> {
        self.run(&[], path).await
    }
}

/// Extracts `media.track` from mediainfo's JSON output.
pub fn parse_tracks(json: &str) -> Result<Vec<Track>> {
    let value: Value = serde_json::from_str(json)?;
    let tracks = value
        .get("media")
        .and_then(|m| m.get("track"))
        .and_then(Value::as_array)
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|t| t.as_object().cloned())
                .collect()
        })
        .unwrap_or_default();
    Ok(tracks)
}

/// A track field as text, whether it was encoded as a string or a number.
pub fn field(track: &Track, key: &str) -> Option<String> {
    match track.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
