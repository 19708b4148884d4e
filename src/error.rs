use std::path::PathBuf;
use thiserror::Error;

/// The error type of the [`Mpls::from`] method.
///
/// [`Mpls::from`]: ../mpls/struct.Mpls.html#method.from
#[derive(Error, Debug)]
pub enum MplsError {
    /// An I/O error occurred while reading the playlist.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The file does not start with the `MPLS` type indicator.
    #[error("not a movie playlist file")]
    NotMpls,
    /// Failed to parse the byte stream as valid MPLS.
    #[error("failed to parse byte stream as valid MPLS")]
    Parse,
}

/// Errors raised while analysing a disc.
///
/// Every variant is attributable to a single disc or playlist; callers decide
/// whether that means skipping a line, a playlist or the whole disc.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to decode playlist {}: {source}", .path.display())]
    PlaylistDecode {
        path: PathBuf,
        #[source]
        source: MplsError,
    },

    #[error("no valid playlists found for disc {}", .0.display())]
    NoEligiblePlaylists(PathBuf),

    #[error("no eligible titles found for disc {}: {reason}", .path.display())]
    NoEligibleTitles { path: PathBuf, reason: String },

    #[error("report section missing: {0}")]
    ReportSectionMissing(&'static str),

    #[error("cannot decode {field} line: {line:?}")]
    FieldDecode { field: &'static str, line: String },

    #[error("XPL parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("unsupported platform for the disc scanner: {0}")]
    UnsupportedPlatform(String),

    #[error("scanner produced no report for playlist {0}")]
    ScanOutputMissing(String),

    #[error("media info error: {0}")]
    MediaInfo(String),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn field(field: &'static str, line: &str) -> Self {
        Error::FieldDecode {
            field,
            line: line.to_string(),
        }
    }
}
