//! Blu-ray playlist enumeration.
use crate::{
    mpls::Mpls,
    types::{ClipRef, Playlist},
    Error, Result,
};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Playlists shorter than this are menus, trailers and the like.
pub const MIN_PLAYLIST_SECONDS: f64 = 180.0;

/// Resolves the `BDMV` directory of a disc.
///
/// Accepts either the `BDMV` directory itself or the disc root containing it.
pub fn bdmv_dir(disc: &Path) -> PathBuf {
    let nested = disc.join("BDMV");
    if !disc.join("PLAYLIST").is_dir() && nested.join("PLAYLIST").is_dir() {
        nested
    } else {
        disc.to_path_buf()
    }
}

/// Reads one `.mpls` file and sizes the stream files it references.
///
/// Stream files that are missing from `stream_dir` are recorded with a size
/// of 0.
pub fn read_playlist(path: &Path, stream_dir: &Path) -> Result<Playlist> {
    let mpls = File::open(path)
        .map_err(Into::into)
        .and_then(Mpls::from)
        .map_err(|source| Error::PlaylistDecode {
            path: path.to_path_buf(),
            source,
        })?;

    let clips = mpls
        .clips()
        .into_iter()
        .map(|clip| clip_ref(stream_dir, clip.file_name.trim()))
        .collect();

    Ok(Playlist {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        duration_seconds: mpls.duration_seconds(),
        clips,
    })
}

fn clip_ref(stream_dir: &Path, name: &str) -> ClipRef {
    let lower = stream_dir.join(format!("{}.m2ts", name));
    let file = if lower.exists() {
        lower
    } else {
        let upper = stream_dir.join(format!("{}.M2TS", name));
        if upper.exists() {
            upper
        } else {
            lower
        }
    };
    let size_bytes = fs::metadata(&file).map(|m| m.len()).unwrap_or(0);
    ClipRef { file, size_bytes }
}

/// Lists every playlist of a disc that runs for at least
/// [`MIN_PLAYLIST_SECONDS`].
///
/// Playlists are returned in file name order. A playlist that fails to
/// decode is logged and left out; only a missing `PLAYLIST` directory fails
/// the whole disc.
pub fn index_playlists(disc: &Path) -> Result<Vec<Playlist>> {
    let bdmv = bdmv_dir(disc);
    let playlist_dir = bdmv.join("PLAYLIST");
    if !playlist_dir.is_dir() {
        return Err(Error::MissingDirectory(playlist_dir));
    }
    let stream_dir = bdmv.join("STREAM");

    let mut files: Vec<PathBuf> = fs::read_dir(&playlist_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|e| e.eq_ignore_ascii_case("mpls"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut playlists = Vec::new();
    for file in files {
        match read_playlist(&file, &stream_dir) {
            Ok(p) if p.duration_seconds >= MIN_PLAYLIST_SECONDS => playlists.push(p),
            Ok(p) => debug!(
                "skipping {}: {:.0}s is too short",
                p.file_name, p.duration_seconds
            ),
            Err(e) => warn!("{}", e),
        }
    }
    Ok(playlists)
}
