//! Decoding of BDInfo playlist reports.
//!
//! A full report is loosely structured text. It is cut into three pieces by
//! literal markers:
//!
//! * the `FILES:` table (up to `CHAPTERS:`),
//! * the quick summary, from `QUICK SUMMARY:` up to the `****` separator,
//! * the extended summary, the third `[code]` segment up to `FILES:`.
//!
//! The quick summary is then read line by line. A line that cannot be
//! decoded is logged and skipped; it never spoils the rest of the report.
use crate::{
    types::{AudioTrack, BdInfoResult, FileEntry, VideoTrack},
    Error, Result,
};
use std::path::Path;
use tracing::warn;

pub const FILES_MARKER: &str = "FILES:";
pub const CHAPTERS_MARKER: &str = "CHAPTERS:";
pub const SUMMARY_MARKER: &str = "QUICK SUMMARY:";
pub const SEPARATOR_MARKER: &str = "********************";
pub const CODE_MARKER: &str = "[code]";

/// Number of `/` separated positions of a video line.
pub const VIDEO_FIELDS: usize = 9;

/// The three pieces of a full report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSections {
    /// Rows of the files table, without its heading.
    pub files: String,
    pub summary: String,
    pub extended_summary: String,
}

/// A decoded report together with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub summary: String,
    pub extended_summary: String,
    pub bdinfo: BdInfoResult,
}

/// A textual flag inside a stream line that pushes the following positions
/// one place to the right.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Marker {
    Stereoscopic(Eye),
    Immersive(ImmersiveFormat),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
    Unspecified,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImmersiveFormat {
    Atmos,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkerRule {
    /// Substring that identifies the marker.
    pub needle: &'static str,
    pub marker: Marker,
    /// How far later positions move when the marker is present.
    pub shift: usize,
}

/// Markers recognised in the third position of a video line. First match wins.
pub const VIDEO_MARKERS: &[MarkerRule] = &[
    MarkerRule {
        needle: "Left Eye",
        marker: Marker::Stereoscopic(Eye::Left),
        shift: 1,
    },
    MarkerRule {
        needle: "Right Eye",
        marker: Marker::Stereoscopic(Eye::Right),
        shift: 1,
    },
    MarkerRule {
        needle: "Eye",
        marker: Marker::Stereoscopic(Eye::Unspecified),
        shift: 1,
    },
];

/// Markers recognised in the third position of an audio line.
pub const AUDIO_MARKERS: &[MarkerRule] = &[MarkerRule {
    needle: "Atmos",
    marker: Marker::Immersive(ImmersiveFormat::Atmos),
    shift: 1,
}];

/// Finds the first rule whose needle occurs in `field`.
pub fn lookup_marker(field: &str, rules: &'static [MarkerRule]) -> Option<&'static MarkerRule> {
    rules.iter().find(|r| field.contains(r.needle))
}

fn section<'a>(text: &'a str, marker: &'static str) -> Result<(&'a str, &'a str)> {
    text.split_once(marker)
        .ok_or(Error::ReportSectionMissing(marker))
}

/// Cuts a full report into its files table, quick summary and extended
/// summary. Any missing marker fails the whole report.
pub fn split_report(text: &str) -> Result<ReportSections> {
    let (head, tail) = section(text, SUMMARY_MARKER)?;
    let (_, files) = section(head, FILES_MARKER)?;
    let (files, _) = section(files, CHAPTERS_MARKER)?;
    let (summary, _) = section(tail.trim_end(), SEPARATOR_MARKER)?;

    let code: Vec<&str> = text.splitn(4, CODE_MARKER).collect();
    let extended = code
        .get(2)
        .ok_or(Error::ReportSectionMissing(CODE_MARKER))?
        .trim_end();
    let extended = match extended.split_once(FILES_MARKER) {
        Some((before, _)) => before,
        None => extended,
    };

    Ok(ReportSections {
        files: table_rows(files),
        summary: summary.trim().to_string(),
        extended_summary: extended.trim().to_string(),
    })
}

// drops the column heading, i.e. everything up to the dashed underline
fn table_rows(files: &str) -> String {
    let lines: Vec<&str> = files.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim_start().starts_with("---"))
        .map(|i| i + 1)
        .unwrap_or(0);
    lines[start..].join("\n")
}

/// Parses a full report read from `disc_path`'s scan.
pub fn parse_report(text: &str, disc_path: &Path) -> Result<ParsedReport> {
    let sections = split_report(text)?;
    let bdinfo = parse_summary(&sections.summary, &sections.files, disc_path);
    Ok(ParsedReport {
        summary: sections.summary,
        extended_summary: sections.extended_summary,
        bdinfo,
    })
}

/// Decodes the quick summary and files table into a [`BdInfoResult`].
pub fn parse_summary(summary: &str, files: &str, disc_path: &Path) -> BdInfoResult {
    let mut bdinfo = BdInfoResult {
        path: disc_path.to_path_buf(),
        ..Default::default()
    };
    for raw in summary.lines() {
        if let Err(e) = apply_line(&mut bdinfo, raw) {
            warn!("{}", e);
        }
    }
    bdinfo.files = parse_files(files);
    bdinfo.file_lengths = parse_file_lengths(files);
    bdinfo
}

/// Strips the leading `*` of a detail line.
fn detail_line(raw: &str) -> &str {
    let line = raw.trim();
    match line.strip_prefix('*') {
        Some(rest) => rest.trim_start_matches('*').trim(),
        None => line,
    }
}

fn value_of(line: &str) -> &str {
    line.split_once(':').map(|(_, v)| v).unwrap_or("")
}

fn before_dot(value: &str) -> String {
    value.split('.').next().unwrap_or("").trim().to_string()
}

fn apply_line(bdinfo: &mut BdInfoResult, raw: &str) -> Result<()> {
    let line = detail_line(raw);
    let lower = line.to_ascii_lowercase();
    let value = value_of(line);

    if lower.starts_with("playlist:") {
        bdinfo.playlist = before_dot(value);
    } else if lower.starts_with("disc size:") {
        let size = decode_disc_size(value).ok_or_else(|| Error::field("disc size", raw))?;
        bdinfo.size_gib = Some(size);
    } else if lower.starts_with("length:") {
        bdinfo.length = before_dot(value);
    } else if lower.starts_with("video:") {
        bdinfo.video.push(decode_video(value));
    } else if lower.starts_with("audio:") {
        let audio = decode_audio(value).ok_or_else(|| Error::field("audio", raw))?;
        bdinfo.audio.push(audio);
    } else if lower.starts_with("disc title:") {
        bdinfo.title = Some(value.trim().to_string());
    } else if lower.starts_with("disc label:") {
        bdinfo.label = Some(value.trim().to_string());
    } else if lower.starts_with("subtitle:") {
        bdinfo.subtitles.push(decode_subtitle(value));
    }
    Ok(())
}

/// `"46,170,456,064 bytes"` to GiB.
pub fn decode_disc_size(value: &str) -> Option<f64> {
    let bytes = value.split("bytes").next()?.replace(',', "");
    let bytes: f64 = bytes.trim().parse().ok()?;
    Some(bytes / (1u64 << 30) as f64)
}

/// Splits a stream line into trimmed positions, padded with empty strings
/// to at least `min` entries.
pub fn split_fields(value: &str, min: usize) -> Vec<&str> {
    let mut fields: Vec<&str> = value.splitn(13, '/').map(str::trim).collect();
    while fields.len() < min {
        fields.push("");
    }
    fields
}

fn at(fields: &[&str], i: usize) -> String {
    fields.get(i).copied().unwrap_or("").to_string()
}

/// Decodes the value of a `Video:` line. Never fails; absent positions are
/// left empty.
pub fn decode_video(value: &str) -> VideoTrack {
    let fields = split_fields(value, VIDEO_FIELDS);
    let (n, stereoscopic) = match lookup_marker(fields[2], VIDEO_MARKERS) {
        Some(rule) => (rule.shift, fields[2].to_string()),
        None => (0, String::new()),
    };
    VideoTrack {
        codec: at(&fields, 0),
        bitrate: at(&fields, 1),
        resolution: at(&fields, n + 2),
        fps: at(&fields, n + 3),
        aspect_ratio: at(&fields, n + 4),
        profile: at(&fields, n + 5),
        bit_depth: at(&fields, n + 6),
        hdr: at(&fields, n + 7),
        color_space: at(&fields, n + 8),
        stereoscopic,
    }
}

/// Decodes the value of an `Audio:` line.
///
/// The parenthesised embedded-core suffix is ignored. Language, codec,
/// channels, sample rate and bitrate are required; the bit depth may be
/// missing.
pub fn decode_audio(value: &str) -> Option<AudioTrack> {
    let value = value.split('(').next().unwrap_or("");
    let fields: Vec<&str> = value.split('/').map(str::trim).collect();
    let (n, immersive) = match lookup_marker(fields.get(2)?, AUDIO_MARKERS) {
        Some(rule) => (rule.shift, fields[2].to_string()),
        None => (0, String::new()),
    };
    let required = |i: usize| fields.get(i).map(|s| s.to_string());
    Some(AudioTrack {
        language: required(0)?,
        codec: required(1)?,
        channels: required(n + 2)?,
        sample_rate: required(n + 3)?,
        bitrate: required(n + 4)?,
        bit_depth: at(&fields, n + 5),
        immersive,
    })
}

/// The language of a `Subtitle:` line.
pub fn decode_subtitle(value: &str) -> String {
    value.split('/').next().unwrap_or("").trim().to_string()
}

/// Reads the files table, keeping filename markers such as `(1)` with the
/// name. Rows with fewer than five columns are ignored.
pub fn parse_files(table: &str) -> Vec<FileEntry> {
    let mut files = Vec::new();
    for line in table.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }
        let (file, rest) = if parts[1].starts_with('(') && parts[1].contains(')') {
            (format!("{} {}", parts[0], parts[1]), &parts[2..])
        } else {
            (parts[0].to_string(), &parts[1..])
        };
        files.push(FileEntry {
            file,
            length: rest[1].to_string(),
        });
    }
    files
}

/// Reads the files table strictly by column: name, time in, length.
pub fn parse_file_lengths(table: &str) -> Vec<FileEntry> {
    table
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .filter(|cols| cols.len() >= 5)
        .map(|cols| FileEntry {
            file: cols[0].to_string(),
            length: cols[2].to_string(),
        })
        .collect()
}
