//! The disc data model.
//!
//! One [`Disc`] exists per source directory. It is created before any stage
//! runs and every stage fills in its own part of it; nothing here is shared
//! between discs.
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    path::PathBuf,
};

/// The physical format a disc directory was mastered for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscFormat {
    BluRay,
    Dvd,
    HdDvd,
}

impl Display for DiscFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscFormat::BluRay => write!(f, "Blu-ray"),
            DiscFormat::Dvd => write!(f, "DVD"),
            DiscFormat::HdDvd => write!(f, "HD-DVD"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disc {
    pub path: PathBuf,
    pub format: DiscFormat,
    /// Playlists chosen for scanning, in selection order.
    pub playlists: Vec<Playlist>,
    /// The short report of the primary playlist.
    pub summary: Option<String>,
    /// The decoded report of the primary playlist.
    pub bdinfo: Option<BdInfoResult>,
    /// Reports of every further selected playlist.
    pub variants: Vec<BdInfoVariant>,
    pub title_set: Option<TitleSet>,
    pub hddvd: Option<HdInfo>,
}

impl Disc {
    pub fn new(path: impl Into<PathBuf>, format: DiscFormat) -> Self {
        Disc {
            path: path.into(),
            format,
            playlists: Vec::new(),
            summary: None,
            bdinfo: None,
            variants: Vec::new(),
            title_set: None,
            hddvd: None,
        }
    }
}

/// A Blu-ray playlist that is long enough to be worth scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    /// File name including the `.mpls` extension.
    pub file_name: String,
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub clips: Vec<ClipRef>,
}

/// A stream file referenced by a playlist.
///
/// `size_bytes` is 0 when the stream file is not on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRef {
    pub file: PathBuf,
    pub size_bytes: u64,
}

impl Playlist {
    /// Sum of the sizes of all referenced stream files.
    pub fn total_size(&self) -> u64 {
        self.clips.iter().map(|c| c.size_bytes).sum()
    }

    /// The playlist number, i.e. the file name without its extension.
    pub fn number(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(i) => &self.file_name[..i],
            None => &self.file_name,
        }
    }

    /// One line listing for selection prompts:
    /// `00800.mpls - 1h 52m 36s - 00001.m2ts (27286 MB), ...`
    pub fn describe(&self) -> String {
        let clips: Vec<String> = self
            .clips
            .iter()
            .map(|c| {
                let name = c
                    .file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{} ({} MB)", name, c.size_bytes / (1024 * 1024))
            })
            .collect();
        format!(
            "{} - {} - {}",
            self.file_name,
            hms(self.duration_seconds),
            clips.join(", ")
        )
    }
}

/// Formats seconds as `Hh Mm Ss`.
pub fn hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

/// The decoded form of one scanner report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BdInfoResult {
    pub path: PathBuf,
    pub playlist: String,
    pub size_gib: Option<f64>,
    pub length: String,
    pub title: Option<String>,
    pub label: Option<String>,
    pub edition: Option<String>,
    pub video: Vec<VideoTrack>,
    pub audio: Vec<AudioTrack>,
    pub subtitles: Vec<String>,
    /// Stream files with their play length, filename markers preserved.
    pub files: Vec<FileEntry>,
    /// The same table read column-wise without marker handling.
    pub file_lengths: Vec<FileEntry>,
}

/// A report for a playlist other than the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BdInfoVariant {
    /// Position in the selection, always greater than zero.
    pub index: usize,
    pub summary: String,
    pub bdinfo: BdInfoResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub file: String,
    pub length: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    pub codec: String,
    pub bitrate: String,
    pub resolution: String,
    pub fps: String,
    pub aspect_ratio: String,
    pub profile: String,
    pub bit_depth: String,
    pub hdr: String,
    pub color_space: String,
    /// Raw eye marker for stereoscopic streams, empty otherwise.
    pub stereoscopic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub language: String,
    pub codec: String,
    pub channels: String,
    pub sample_rate: String,
    pub bitrate: String,
    pub bit_depth: String,
    /// Raw object-audio marker (e.g. `Atmos Audio`), empty otherwise.
    pub immersive: String,
}

/// DVD size class derived from the cumulative size of the disc directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    Dvd5,
    Dvd9,
    Unclassified,
}

impl Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Dvd5 => write!(f, "DVD5"),
            SizeClass::Dvd9 => write!(f, "DVD9"),
            SizeClass::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// The DVD title set chosen as the main feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleSet {
    /// Two-digit set id, e.g. `"01"` for `VTS_01_*`.
    pub set_id: String,
    /// Member VOB file names, sorted.
    pub files: Vec<String>,
    pub duration_seconds: f64,
    pub size_gib: f64,
    pub size_class: SizeClass,
    pub vob_path: PathBuf,
    pub ifo_path: PathBuf,
    pub vob_report: String,
    pub ifo_report: String,
}

/// A title from an HD-DVD XPL playlist.
///
/// Attributes are kept as written; absent attributes are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdTitle {
    pub number: Option<String>,
    pub duration: String,
    pub display_name: Option<String>,
    pub on_end: Option<String>,
    pub alternative_sd_display_mode: Option<String>,
    pub primary_clips: Vec<HdClip>,
    pub chapters: Vec<HdChapter>,
    pub audio_tracks: Vec<HdNavigationTrack>,
    pub subtitle_tracks: Vec<HdNavigationTrack>,
    pub application_segments: Vec<HdApplicationSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdClip {
    pub src: Option<String>,
    pub time_begin: Option<String>,
    pub time_end: Option<String>,
    pub seamless: Option<String>,
    pub audio_tracks: Vec<HdClipTrack>,
    pub subtitle_tracks: Vec<HdClipTrack>,
}

/// An `Audio` or `Subtitle` element of a primary clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdClipTrack {
    pub track: Option<String>,
    pub stream_number: Option<String>,
    pub media_attr: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdChapter {
    pub display_name: Option<String>,
    pub time_begin: Option<String>,
}

/// An `AudioTrack` or `SubtitleTrack` of a title's navigation list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdNavigationTrack {
    pub track: Option<String>,
    pub langcode: Option<String>,
    pub selectable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdApplicationSegment {
    pub src: Option<String>,
    pub time_begin: Option<String>,
    pub time_end: Option<String>,
    pub sync: Option<String>,
    pub z_order: Option<String>,
    pub resources: Vec<HdApplicationResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdApplicationResource {
    pub src: Option<String>,
    pub size: Option<String>,
    pub priority: Option<String>,
    pub multiplexed: Option<String>,
}

/// How the HD-DVD media file was chosen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdSource {
    /// The longest title of the XPL playlist.
    Playlist,
    /// The largest EVO file of the directory.
    LargestFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdInfo {
    pub titles: Vec<HdTitle>,
    pub source: HdSource,
    pub evo_path: PathBuf,
    /// Media report of `evo_path`; rewritten with the title's totals when
    /// `source` is [`HdSource::Playlist`].
    pub evo_report: String,
}
