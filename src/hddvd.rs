//! HD-DVD playlist (XPL) parsing.
//!
//! The longest title of the advanced content playlist identifies the main
//! feature. Its clips are summed up and the media report of the first clip is
//! rewritten to describe the whole title. When there is no usable playlist
//! the largest EVO file of the disc is used instead.
use crate::{
    mediainfo::MediaInfoSource,
    types::{
        HdApplicationResource, HdApplicationSegment, HdChapter, HdClip, HdClipTrack, HdInfo,
        HdNavigationTrack, HdSource, HdTitle,
    },
    Error, Result,
};
use regex::NoExpand;
use roxmltree::{Document, Node};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub const XPL_NAMESPACE: &str = "http://www.dvdforum.org/2005/HDDVDVideo/Playlist";

/// Titles of this length or shorter are not considered.
pub const MIN_TITLE_SECONDS: u64 = 600;

const ZERO_TIMECODE: &str = "00:00:00:00";

macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// Converts an `H:M:S:F` timecode to whole seconds.
///
/// The frame count is ignored. Anything but four colon separated integers,
/// or a value too large for `u64`, converts to 0.
pub fn timecode_to_seconds(timecode: &str) -> u64 {
    let [h, m, s, _] = match timecode_fields(timecode) {
        Some(f) => f,
        None => return 0,
    };
    h.checked_mul(3600)
        .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(s))
        .unwrap_or(0)
}

fn timecode_fields(timecode: &str) -> Option<[u64; 4]> {
    let parts: Vec<&str> = timecode.split(':').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut fields = [0u64; 4];
    for (field, part) in fields.iter_mut().zip(parts) {
        *field = part.trim().parse().ok()?;
    }
    Some(fields)
}

/// Renders a timecode as `H h M min`, leaving out zero parts.
pub fn format_duration(timecode: &str) -> String {
    let [hours, minutes, _, _] = match timecode_fields(timecode) {
        Some(f) => f,
        None => return "Unknown duration".to_string(),
    };
    let mut duration = String::new();
    if hours > 0 {
        duration.push_str(&format!("{} h ", hours));
    }
    if minutes > 0 {
        duration.push_str(&format!("{} min", minutes));
    }
    duration.trim().to_string()
}

fn is(node: &Node, name: &str) -> bool {
    node.is_element() && node.has_tag_name((XPL_NAMESPACE, name))
}

fn attr(node: &Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

fn descendants<'a, 'input: 'a>(
    node: &Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants().filter(move |n| is(n, name))
}

// `parent/child` at any depth below `node`
fn nested<'a, 'input: 'a>(
    node: &Node<'a, 'input>,
    parent: &'a str,
    child: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    descendants(node, parent).flat_map(move |p| p.children().filter(move |n| is(n, child)))
}

fn clip_track(node: Node) -> HdClipTrack {
    HdClipTrack {
        track: attr(&node, "track"),
        stream_number: attr(&node, "streamNumber"),
        media_attr: attr(&node, "mediaAttr"),
        description: attr(&node, "description"),
    }
}

fn navigation_track(node: Node) -> HdNavigationTrack {
    HdNavigationTrack {
        track: attr(&node, "track"),
        langcode: attr(&node, "langcode"),
        selectable: attr(&node, "selectable"),
    }
}

fn title(node: &Node, duration: String) -> HdTitle {
    let primary_clips = descendants(node, "PrimaryAudioVideoClip")
        .map(|clip| HdClip {
            src: attr(&clip, "src"),
            time_begin: attr(&clip, "titleTimeBegin"),
            time_end: attr(&clip, "titleTimeEnd"),
            seamless: attr(&clip, "seamless"),
            audio_tracks: descendants(&clip, "Audio").map(clip_track).collect(),
            subtitle_tracks: descendants(&clip, "Subtitle").map(clip_track).collect(),
        })
        .collect();

    let chapters = nested(node, "ChapterList", "Chapter")
        .map(|c| HdChapter {
            display_name: attr(&c, "displayName"),
            time_begin: attr(&c, "titleTimeBegin"),
        })
        .collect();

    let application_segments = descendants(node, "ApplicationSegment")
        .map(|seg| HdApplicationSegment {
            src: attr(&seg, "src"),
            time_begin: attr(&seg, "titleTimeBegin"),
            time_end: attr(&seg, "titleTimeEnd"),
            sync: attr(&seg, "sync"),
            z_order: attr(&seg, "zOrder"),
            resources: descendants(&seg, "ApplicationResource")
                .map(|r| HdApplicationResource {
                    src: attr(&r, "src"),
                    size: attr(&r, "size"),
                    priority: attr(&r, "priority"),
                    multiplexed: attr(&r, "multiplexed"),
                })
                .collect(),
        })
        .collect();

    HdTitle {
        number: attr(node, "titleNumber"),
        duration,
        display_name: attr(node, "displayName"),
        on_end: attr(node, "onEnd"),
        alternative_sd_display_mode: attr(node, "alternativeSDDisplayMode"),
        primary_clips,
        chapters,
        audio_tracks: nested(node, "TrackNavigationList", "AudioTrack")
            .map(navigation_track)
            .collect(),
        subtitle_tracks: nested(node, "TrackNavigationList", "SubtitleTrack")
            .map(navigation_track)
            .collect(),
        application_segments,
    }
}

/// Parses XPL text into its titles, in document order, leaving out titles of
/// [`MIN_TITLE_SECONDS`] or less.
pub fn parse_playlist(xml: &str) -> Result<Vec<HdTitle>> {
    let doc = Document::parse(xml)?;
    let titles = doc
        .root()
        .descendants()
        .filter(|n| is(n, "Title"))
        .filter_map(|node| {
            let duration = node
                .attribute("titleDuration")
                .unwrap_or(ZERO_TIMECODE)
                .to_string();
            if timecode_to_seconds(&duration) <= MIN_TITLE_SECONDS {
                return None;
            }
            Some(title(&node, duration))
        })
        .collect();
    Ok(titles)
}

/// The longest title; ties go to the first.
pub fn longest_title(titles: &[HdTitle]) -> Option<&HdTitle> {
    let mut longest: Option<&HdTitle> = None;
    for t in titles {
        match longest {
            Some(l) if timecode_to_seconds(&l.duration) >= timecode_to_seconds(&t.duration) => {}
            _ => longest = Some(t),
        }
    }
    longest
}

/// The first `.xpl` file in `ADV_OBJ` next to or above the EVO directory.
pub fn find_playlist(dir: &Path) -> Option<PathBuf> {
    let mut candidates = vec![dir.join("ADV_OBJ")];
    if let Some(parent) = dir.parent() {
        candidates.push(parent.join("ADV_OBJ"));
    }
    for adv_obj in candidates {
        let mut xpl: Vec<PathBuf> = match fs::read_dir(&adv_obj) {
            Ok(entries) => entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .map(|e| e.eq_ignore_ascii_case("xpl"))
                        .unwrap_or(false)
                })
                .collect(),
            Err(_) => continue,
        };
        xpl.sort();
        if let Some(first) = xpl.into_iter().next() {
            return Some(first);
        }
    }
    None
}

/// EVO files of a title's primary clips, in play order.
pub fn clip_files(dir: &Path, title: &HdTitle) -> Vec<PathBuf> {
    title
        .primary_clips
        .iter()
        .filter_map(|c| c.src.as_deref())
        .map(|src| {
            let base = src.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(src);
            dir.join(base.replace(".MAP", ".EVO"))
        })
        .collect()
}

/// Replaces the `File size` and `Duration` values of a text media report.
pub fn rewrite_report(report: &str, total_bytes: u64, timecode: &str) -> String {
    let size = format!(
        "File size                                : {:.2} GiB",
        total_bytes as f64 / (1u64 << 30) as f64
    );
    let duration = format!(
        "Duration                                 : {}",
        format_duration(timecode)
    );
    let report = regex!(r"File size\s+:\s+[^\r\n]+").replace_all(report, NoExpand(&size));
    regex!(r"Duration\s+:\s+[^\r\n]+")
        .replace_all(&report, NoExpand(&duration))
        .into_owned()
}

/// The largest `.EVO` file in `dir`; ties go to the first in name order.
pub fn largest_evo(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files: Vec<(PathBuf, u64)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_evo = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("evo"))
            .unwrap_or(false);
        if is_evo {
            files.push((path, entry.metadata()?.len()));
        }
    }
    files.sort();

    let mut largest: Option<(PathBuf, u64)> = None;
    for (path, size) in files {
        match &largest {
            Some((_, s)) if *s >= size => {}
            _ => largest = Some((path, size)),
        }
    }
    Ok(largest.map(|(p, _)| p))
}

async fn from_playlist<M: MediaInfoSource>(dir: &Path, media: &M) -> Result<HdInfo> {
    let xpl = find_playlist(dir).ok_or_else(|| Error::MissingDirectory(dir.join("ADV_OBJ")))?;
    info!("reading HD-DVD playlist {}", xpl.display());
    let titles = parse_playlist(&fs::read_to_string(&xpl)?)?;

    let no_titles = |reason: String| Error::NoEligibleTitles {
        path: dir.to_path_buf(),
        reason,
    };
    let longest = longest_title(&titles)
        .ok_or_else(|| no_titles("no title longer than 10 minutes".to_string()))?;
    let evo_files = clip_files(dir, longest);
    let first = evo_files
        .first()
        .cloned()
        .ok_or_else(|| no_titles("longest title has no primary clips".to_string()))?;
    if !first.is_file() {
        return Err(no_titles(format!("first clip {} is missing", first.display())));
    }

    let mut total = 0u64;
    for file in &evo_files {
        match fs::metadata(file) {
            Ok(meta) => total += meta.len(),
            Err(e) => warn!("clip {} not counted: {}", file.display(), e),
        }
    }
    let report = media.text_report(&first).await?;
    let evo_report = rewrite_report(&report, total, &longest.duration);

    Ok(HdInfo {
        titles,
        source: HdSource::Playlist,
        evo_path: first,
        evo_report,
    })
}

/// Describes the main feature of the HD-DVD whose EVO files are in `dir`.
///
/// Any failure to use the playlist, whether it is missing, unreadable,
/// without a qualifying title or pointing at clips that cannot be read, falls
/// back to the largest EVO file.
pub async fn analyze<M: MediaInfoSource>(dir: &Path, media: &M) -> Result<HdInfo> {
    match from_playlist(dir, media).await {
        Ok(info) => return Ok(info),
        Err(e) => warn!("playlist processing failed: {}. Falling back to largest EVO file", e),
    }

    let largest = largest_evo(dir)?.ok_or_else(|| Error::NoEligibleTitles {
        path: dir.to_path_buf(),
        reason: "no EVO files found".to_string(),
    })?;
    let evo_report = media.text_report(&largest).await?;
    Ok(HdInfo {
        titles: Vec::new(),
        source: HdSource::LargestFile,
        evo_path: largest,
        evo_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediainfo::tests::Canned;
    use tempfile::tempdir;

    pub const XPL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Playlist xmlns="http://www.dvdforum.org/2005/HDDVDVideo/Playlist" majorVersion="1" minorVersion="0">
  <TitleSet>
    <Title titleNumber="1" titleDuration="00:05:00:00" displayName="Intro">
      <PrimaryAudioVideoClip src="file:///dvddisc/HVDVD_TS/INTRO.MAP" titleTimeBegin="00:00:00:00" titleTimeEnd="00:05:00:00"/>
    </Title>
    <Title titleNumber="2" titleDuration="01:30:00:00" displayName="Feature" onEnd="1">
      <PrimaryAudioVideoClip src="file:///dvddisc/HVDVD_TS/FEATURE_1.MAP" titleTimeBegin="00:00:00:00" titleTimeEnd="00:45:00:00" seamless="false">
        <Audio track="1" streamNumber="1" mediaAttr="1" description="English"/>
        <Subtitle track="1" streamNumber="1" mediaAttr="1"/>
      </PrimaryAudioVideoClip>
      <PrimaryAudioVideoClip src="file:///dvddisc/HVDVD_TS/FEATURE_2.MAP" titleTimeBegin="00:45:00:00" titleTimeEnd="01:30:00:00" seamless="true"/>
      <ChapterList>
        <Chapter displayName="Chapter 1" titleTimeBegin="00:00:00:00"/>
        <Chapter displayName="Chapter 2" titleTimeBegin="00:10:00:00"/>
      </ChapterList>
      <TrackNavigationList>
        <AudioTrack track="1" langcode="en" selectable="true"/>
        <SubtitleTrack track="1" langcode="en" selectable="true"/>
        <SubtitleTrack track="2" langcode="fr" selectable="false"/>
      </TrackNavigationList>
      <ApplicationSegment src="file:///dvddisc/ADV_OBJ/MENU.XMF" titleTimeBegin="00:00:00:00" titleTimeEnd="01:30:00:00" sync="hard" zOrder="0">
        <ApplicationResource src="file:///dvddisc/ADV_OBJ/MENU.ACA" size="1024" priority="1" multiplexed="false"/>
      </ApplicationSegment>
    </Title>
    <Title titleNumber="3" titleDuration="00:20:00:00" displayName="Bonus"/>
  </TitleSet>
</Playlist>"#;

    #[test]
    fn timecodes() {
        assert_eq!(timecode_to_seconds("01:30:00:00"), 5400);
        assert_eq!(timecode_to_seconds("00:10:00:23"), 600);
        assert_eq!(timecode_to_seconds("bad"), 0);
        assert_eq!(timecode_to_seconds("01:30:00"), 0);
        assert_eq!(timecode_to_seconds("01:xx:00:00"), 0);
        assert_eq!(timecode_to_seconds("9999999999999999:00:00:00"), 0);
        assert_eq!(timecode_to_seconds("00:00:18446744073709551615:00"), u64::MAX);
        assert_eq!(timecode_to_seconds("00:01:18446744073709551615:00"), 0);
    }

    #[test]
    fn huge_title_duration_is_not_a_feature() {
        let xml = format!(
            r#"<Playlist xmlns="{}"><Title titleDuration="9999999999999999:00:00:00"/></Playlist>"#,
            XPL_NAMESPACE
        );
        let titles = parse_playlist(&xml).unwrap();
        assert!(longest_title(&titles).is_none());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration("01:30:00:00"), "1 h 30 min");
        assert_eq!(format_duration("02:00:10:00"), "2 h");
        assert_eq!(format_duration("00:45:00:00"), "45 min");
        assert_eq!(format_duration("nope"), "Unknown duration");
    }

    #[test]
    fn parses_titles() {
        let titles = parse_playlist(XPL).unwrap();
        assert_eq!(titles.len(), 2);

        let feature = &titles[0];
        assert_eq!(feature.number.as_deref(), Some("2"));
        assert_eq!(feature.display_name.as_deref(), Some("Feature"));
        assert_eq!(feature.on_end.as_deref(), Some("1"));
        assert_eq!(feature.primary_clips.len(), 2);
        assert_eq!(feature.primary_clips[0].audio_tracks.len(), 1);
        assert_eq!(
            feature.primary_clips[0].audio_tracks[0].description.as_deref(),
            Some("English")
        );
        assert_eq!(feature.primary_clips[0].subtitle_tracks.len(), 1);
        assert_eq!(feature.primary_clips[1].seamless.as_deref(), Some("true"));
        assert_eq!(feature.chapters.len(), 2);
        assert_eq!(feature.audio_tracks.len(), 1);
        assert_eq!(feature.subtitle_tracks[1].langcode.as_deref(), Some("fr"));
        assert_eq!(feature.application_segments.len(), 1);
        assert_eq!(feature.application_segments[0].resources[0].size.as_deref(), Some("1024"));

        assert_eq!(titles[1].display_name.as_deref(), Some("Bonus"));
        assert_eq!(longest_title(&titles).unwrap().number.as_deref(), Some("2"));
    }

    #[test]
    fn elements_outside_the_namespace_are_ignored() {
        let xml = r#"<Playlist><Title titleDuration="02:00:00:00"/></Playlist>"#;
        assert!(parse_playlist(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml() {
        assert!(matches!(parse_playlist("<Playlist>"), Err(Error::XmlParse(_))));
    }

    #[test]
    fn map_sources_become_evo_files() {
        let titles = parse_playlist(XPL).unwrap();
        assert_eq!(
            clip_files(Path::new("/hd"), &titles[0]),
            vec![
                PathBuf::from("/hd/FEATURE_1.EVO"),
                PathBuf::from("/hd/FEATURE_2.EVO")
            ]
        );
    }

    #[test]
    fn rewrites_size_and_duration() {
        let report = "General\nComplete name                            : FEATURE_1.EVO\nFile size                                : 4.00 GiB\nDuration                                 : 45 min\n\nVideo\nDuration                                 : 45 min 0 s\n";
        let rewritten = rewrite_report(report, 3 << 30, "01:30:00:00");
        assert!(rewritten.contains("File size                                : 3.00 GiB\n"));
        assert!(!rewritten.contains("45 min"));
        let duration = "Duration                                 : 1 h 30 min";
        assert_eq!(rewritten.matches(duration).count(), 2);
        assert!(rewritten.contains("Complete name"));
    }

    fn hd_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("FEATURE_1.EVO"), vec![0u8; 300]).unwrap();
        fs::write(dir.path().join("FEATURE_2.EVO"), vec![0u8; 200]).unwrap();
        fs::write(dir.path().join("INTRO.EVO"), vec![0u8; 400]).unwrap();
        dir
    }

    fn media() -> Canned {
        let mut media = Canned::default();
        for name in ["FEATURE_1.EVO", "INTRO.EVO"] {
            media.reports.insert(
                name.into(),
                format!("Complete name : {}\nFile size : 1 KiB\nDuration : 1 s\n", name),
            );
        }
        media
    }

    #[tokio::test]
    async fn uses_longest_title() {
        let dir = hd_dir();
        fs::create_dir(dir.path().join("ADV_OBJ")).unwrap();
        fs::write(dir.path().join("ADV_OBJ").join("VPLST000.XPL"), XPL).unwrap();

        let info = analyze(dir.path(), &media()).await.unwrap();
        assert_eq!(info.source, HdSource::Playlist);
        assert_eq!(info.titles.len(), 2);
        assert_eq!(info.evo_path, dir.path().join("FEATURE_1.EVO"));
        assert!(info.evo_report.contains(": 0.00 GiB"));
        assert!(info.evo_report.contains(": 1 h 30 min"));
    }

    #[tokio::test]
    async fn falls_back_without_qualifying_titles() {
        let dir = hd_dir();
        fs::create_dir(dir.path().join("ADV_OBJ")).unwrap();
        fs::write(
            dir.path().join("ADV_OBJ").join("VPLST000.XPL"),
            XPL.replace("01:30:00:00\" displayName", "00:09:00:00\" displayName")
                .replace("00:20:00:00", "00:10:00:00"),
        )
        .unwrap();

        let info = analyze(dir.path(), &media()).await.unwrap();
        assert_eq!(info.source, HdSource::LargestFile);
        assert_eq!(info.evo_path, dir.path().join("INTRO.EVO"));
        assert_eq!(info.evo_report, media().reports["INTRO.EVO"]);
    }

    #[tokio::test]
    async fn falls_back_without_playlist() {
        let dir = hd_dir();
        let info = analyze(dir.path(), &media()).await.unwrap();
        assert_eq!(info.source, HdSource::LargestFile);
        assert_eq!(info.evo_path, dir.path().join("INTRO.EVO"));
    }

    #[test]
    fn playlist_in_parent_directory() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("ADV_OBJ")).unwrap();
        fs::write(root.path().join("ADV_OBJ").join("VPLST000.XPL"), "").unwrap();
        let evo_dir = root.path().join("HVDVD_TS");
        fs::create_dir(&evo_dir).unwrap();
        assert_eq!(
            find_playlist(&evo_dir),
            Some(root.path().join("ADV_OBJ").join("VPLST000.XPL"))
        );
    }

    #[tokio::test]
    async fn no_evo_files_at_all() {
        let dir = tempdir().unwrap();
        let err = analyze(dir.path(), &media()).await.unwrap_err();
        assert!(matches!(err, Error::NoEligibleTitles { .. }));
    }

    #[tokio::test]
    async fn falls_back_when_first_clip_is_missing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("FEATURE_2.EVO"), vec![0u8; 200]).unwrap();
        fs::write(dir.path().join("OTHER.EVO"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("ADV_OBJ")).unwrap();
        fs::write(dir.path().join("ADV_OBJ").join("VPLST000.XPL"), XPL).unwrap();

        let mut media = Canned::default();
        media.reports.insert("FEATURE_2.EVO".into(), "feature 2".into());
        media.reports.insert("OTHER.EVO".into(), "other".into());

        let info = analyze(dir.path(), &media).await.unwrap();
        assert_eq!(info.source, HdSource::LargestFile);
        assert_eq!(info.evo_path, dir.path().join("FEATURE_2.EVO"));
        assert_eq!(info.evo_report, "feature 2");
    }

    #[tokio::test]
    async fn falls_back_when_media_info_fails_on_first_clip() {
        let dir = hd_dir();
        fs::create_dir(dir.path().join("ADV_OBJ")).unwrap();
        fs::write(dir.path().join("ADV_OBJ").join("VPLST000.XPL"), XPL).unwrap();

        let mut media = media();
        media.reports.remove("FEATURE_1.EVO");
        let info = analyze(dir.path(), &media).await.unwrap();
        assert_eq!(info.source, HdSource::LargestFile);
        assert_eq!(info.evo_path, dir.path().join("INTRO.EVO"));
    }

    #[tokio::test]
    async fn falls_back_on_undecodable_playlist() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("OTHER.EVO"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("ADV_OBJ")).unwrap();
        fs::write(
            dir.path().join("ADV_OBJ").join("VPLST000.XPL"),
            [0xffu8, 0xfe, 0x3c, 0x00],
        )
        .unwrap();

        let mut media = Canned::default();
        media.reports.insert("OTHER.EVO".into(), "other".into());
        let info = analyze(dir.path(), &media).await.unwrap();
        assert_eq!(info.source, HdSource::LargestFile);
        assert_eq!(info.evo_path, dir.path().join("OTHER.EVO"));
    }
}
