//! DVD title set analysis.
//!
//! VOB files are grouped by their title set (`VTS_<id>_<n>.VOB`). The main
//! feature is the first set whose duration, taken from the set's IFO, is more
//! than 10% longer than the best set seen before it. That rule prefers the
//! first of several episodes of similar length over a slightly longer bonus
//! set further down the disc.
use crate::{
    mediainfo::{self, MediaInfoSource},
    types::{SizeClass, TitleSet},
    Error, Result,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Largest single-layer DVD, in GiB.
pub const DVD5_MAX_GIB: f64 = 4.37;
/// Largest dual-layer DVD, in GiB.
pub const DVD9_MAX_GIB: f64 = 7.95;

/// Title set id of a `VTS_<id>_<n>.VOB` file name.
pub fn set_id(file_name: &str) -> Option<&str> {
    let upper = file_name.to_ascii_uppercase();
    if !upper.starts_with("VTS_") || !upper.ends_with(".VOB") {
        return None;
    }
    file_name.get(4..6)
}

/// VOB files of `dir` grouped by title set id, both sorted.
pub fn group_title_sets(dir: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut sets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        if let Some(id) = set_id(&name) {
            sets.entry(id.to_string()).or_default().push(name.clone());
        }
    }
    Ok(sets)
}

/// Parses a duration that must be a plain decimal number of seconds.
pub fn parse_duration(value: &str) -> Option<f64> {
    let digits = value.replacen('.', "", 1);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// The entry of `dir` named `name`, compared case-insensitively. Falls back
/// to `dir/name` when there is none.
pub fn find_file(dir: &Path, name: &str) -> PathBuf {
    fs::read_dir(dir)
        .ok()
        .and_then(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.eq_ignore_ascii_case(name))
                .min()
        })
        .map(|found| dir.join(found))
        .unwrap_or_else(|| dir.join(name))
}

/// Duration of a title set from the second track of its IFO.
async fn set_duration<M: MediaInfoSource>(media: &M, ifo: &Path) -> Option<f64> {
    let tracks = match media.tracks(ifo).await {
        Ok(t) => t,
        Err(e) => {
            warn!("error processing {}: {}", ifo.display(), e);
            return None;
        }
    };
    let duration = match tracks.get(1) {
        Some(track) => mediainfo::field(track, "Duration").unwrap_or_default(),
        None => {
            warn!("{} has no second track", ifo.display());
            return None;
        }
    };
    let parsed = parse_duration(&duration);
    if parsed.is_none() {
        warn!("skipping title set with invalid duration {:?}", duration);
    }
    parsed
}

/// Picks the main feature among `(id, duration)` pairs, in disc order.
///
/// A set replaces the current choice only when it is more than 10% longer.
pub fn pick_main_set<'a, I>(sets: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut main: Option<(&str, f64)> = None;
    for (id, duration) in sets {
        match main {
            Some((_, best)) if duration <= best * 1.10 => {}
            _ => main = Some((id, duration)),
        }
    }
    main
}

/// Classifies a disc by its cumulative size in GiB.
pub fn size_class(size_gib: f64) -> SizeClass {
    if size_gib <= DVD5_MAX_GIB {
        SizeClass::Dvd5
    } else if size_gib <= DVD9_MAX_GIB {
        SizeClass::Dvd9
    } else {
        SizeClass::Unclassified
    }
}

/// Total size of the regular files directly inside `dir`, in GiB.
pub fn directory_size_gib(dir: &Path) -> Result<f64> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let meta = entry?.metadata()?;
        if meta.is_file() {
            total += meta.len();
        }
    }
    Ok(total as f64 / (1u64 << 30) as f64)
}

/// Finds the main title set of the `VIDEO_TS` directory `dir`.
pub async fn analyze<M: MediaInfoSource>(dir: &Path, media: &M) -> Result<TitleSet> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }
    let sets = group_title_sets(dir)?;

    let mut durations: Vec<(&str, f64)> = Vec::new();
    for id in sets.keys() {
        let ifo = find_file(dir, &format!("VTS_{}_0.IFO", id));
        if let Some(d) = set_duration(media, &ifo).await {
            durations.push((id.as_str(), d));
        }
    }

    let (id, duration) = pick_main_set(durations).ok_or_else(|| Error::NoEligibleTitles {
        path: dir.to_path_buf(),
        reason: "no title set with a readable duration".to_string(),
    })?;
    info!("main title set is VTS_{} ({:.0}s)", id, duration);

    let vob_path = find_file(dir, &format!("VTS_{}_1.VOB", id));
    let ifo_path = find_file(dir, &format!("VTS_{}_0.IFO", id));
    let vob_report = media.text_report(&vob_path).await?;
    let ifo_report = media.text_report(&ifo_path).await?;

    let size_gib = directory_size_gib(dir)?;
    Ok(TitleSet {
        set_id: id.to_string(),
        files: sets.get(id).cloned().unwrap_or_default(),
        duration_seconds: duration,
        size_gib,
        size_class: size_class(size_gib),
        vob_path,
        ifo_path,
        vob_report,
        ifo_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediainfo::tests::Canned;
    use tempfile::tempdir;

    #[test]
    fn set_ids() {
        assert_eq!(set_id("VTS_01_1.VOB"), Some("01"));
        assert_eq!(set_id("VTS_12_0.VOB"), Some("12"));
        assert_eq!(set_id("VTS_01_0.IFO"), None);
        assert_eq!(set_id("VIDEO_TS.VOB"), None);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("5400.120"), Some(5400.12));
        assert_eq!(parse_duration("42"), Some(42.0));
        assert_eq!(parse_duration("Unknown"), None);
        assert_eq!(parse_duration("1.2.3"), None);
        assert_eq!(parse_duration("-5"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn main_set_needs_ten_percent_more() {
        assert_eq!(
            pick_main_set(vec![("01", 100.0), ("02", 105.0), ("03", 200.0)]),
            Some(("03", 200.0))
        );
        assert_eq!(
            pick_main_set(vec![("01", 100.0), ("02", 105.0)]),
            Some(("01", 100.0))
        );
        assert_eq!(
            pick_main_set(vec![("01", 100.0), ("02", 110.0)]),
            Some(("01", 100.0))
        );
        assert_eq!(pick_main_set(Vec::new()), None);
    }

    #[test]
    fn size_classes() {
        assert_eq!(size_class(4.0), SizeClass::Dvd5);
        assert_eq!(size_class(4.37), SizeClass::Dvd5);
        assert_eq!(size_class(4.38), SizeClass::Dvd9);
        assert_eq!(size_class(7.95), SizeClass::Dvd9);
        assert_eq!(size_class(8.5), SizeClass::Unclassified);
    }

    #[tokio::test]
    async fn analyzes_video_ts() {
        let dir = tempdir().unwrap();
        for name in [
            "VIDEO_TS.IFO",
            "VTS_01_0.IFO",
            "VTS_01_1.VOB",
            "VTS_02_0.IFO",
            "VTS_02_1.VOB",
            "VTS_02_2.VOB",
            "VTS_03_0.IFO",
            "VTS_03_1.VOB",
        ] {
            fs::write(dir.path().join(name), b"0123456789").unwrap();
        }

        let mut media = Canned::default();
        media.durations.insert("VTS_01_0.IFO".into(), "300.5".into());
        media.durations.insert("VTS_02_0.IFO".into(), "2700.000".into());
        media.durations.insert("VTS_03_0.IFO".into(), "2800.000".into());
        media.reports.insert("VTS_02_1.VOB".into(), "vob\n".into());
        media.reports.insert("VTS_02_0.IFO".into(), "ifo\n".into());

        let set = analyze(dir.path(), &media).await.unwrap();
        assert_eq!(set.set_id, "02");
        assert_eq!(set.files, vec!["VTS_02_1.VOB", "VTS_02_2.VOB"]);
        assert_eq!(set.duration_seconds, 2700.0);
        assert_eq!(set.vob_path, dir.path().join("VTS_02_1.VOB"));
        assert_eq!(set.ifo_report, "ifo\n");
        assert_eq!(set.size_class, SizeClass::Dvd5);
    }

    #[tokio::test]
    async fn no_readable_durations() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("VTS_01_1.VOB"), b"x").unwrap();
        let err = analyze(dir.path(), &Canned::default()).await.unwrap_err();
        assert!(matches!(err, Error::NoEligibleTitles { .. }));
    }

    #[tokio::test]
    async fn lower_case_rip_keeps_file_names() {
        let dir = tempdir().unwrap();
        for name in ["vts_01_0.ifo", "vts_01_1.vob", "vts_01_2.vob"] {
            fs::write(dir.path().join(name), b"0123456789").unwrap();
        }

        let mut media = Canned::default();
        media.durations.insert("vts_01_0.ifo".into(), "3600".into());
        media.reports.insert("vts_01_1.vob".into(), "vob\n".into());
        media.reports.insert("vts_01_0.ifo".into(), "ifo\n".into());

        let set = analyze(dir.path(), &media).await.unwrap();
        assert_eq!(set.set_id, "01");
        assert_eq!(set.vob_path, dir.path().join("vts_01_1.vob"));
        assert_eq!(set.ifo_path, dir.path().join("vts_01_0.ifo"));
        assert_eq!(set.vob_report, "vob\n");
        assert_eq!(set.files, vec!["vts_01_1.vob", "vts_01_2.vob"]);
    }

    #[test]
    fn finds_files_ignoring_case() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Vts_02_0.Ifo"), b"").unwrap();
        assert_eq!(find_file(dir.path(), "VTS_02_0.IFO"), dir.path().join("Vts_02_0.Ifo"));
        assert_eq!(find_file(dir.path(), "VTS_03_0.IFO"), dir.path().join("VTS_03_0.IFO"));
    }
}
