//! Per-disc processing.
//!
//! Discs are handled one after another. Blu-rays go through playlist
//! indexing, selection, scanning and report parsing; DVDs and HD-DVDs have
//! their own analyzers. A failing disc is logged and skipped, and whatever a
//! stage already stored on it stays there.
use crate::{
    config::{Config, RetryPolicy},
    dvd, hddvd,
    mediainfo::MediaInfoSource,
    playlist,
    report::{self, ParsedReport},
    scan::Scanner,
    select::{self, SelectionInterface},
    types::{BdInfoResult, BdInfoVariant, Disc, DiscFormat, Playlist},
    Error, Result,
};
use std::{
    fs,
    future::Future,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

/// Guesses the format of a disc directory from its layout.
pub fn detect_format(path: &Path) -> Option<DiscFormat> {
    let has_ext = |ext: &str| -> bool {
        fs::read_dir(path)
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|e| {
                    e.path()
                        .extension()
                        .map(|x| x.eq_ignore_ascii_case(ext))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    };

    if path.join("BDMV").is_dir() || path.join("PLAYLIST").is_dir() {
        Some(DiscFormat::BluRay)
    } else if path.join("VIDEO_TS").is_dir() || has_ext("vob") {
        Some(DiscFormat::Dvd)
    } else if path.join("HVDVD_TS").is_dir() || path.join("ADV_OBJ").is_dir() || has_ext("evo") {
        Some(DiscFormat::HdDvd)
    } else {
        None
    }
}

/// Paths of the quick and extended summary files of a selected playlist.
pub fn summary_paths(work_dir: &Path, disc_index: usize, idx: usize) -> (PathBuf, PathBuf) {
    let suffix = if idx == 0 {
        format!("{:02}", disc_index)
    } else {
        format!("{:02}_{}", disc_index, idx)
    };
    (
        work_dir.join(format!("BD_SUMMARY_{}.txt", suffix)),
        work_dir.join(format!("BD_SUMMARY_EXT_{}.txt", suffix)),
    )
}

fn subdir_or_self(path: &Path, name: &str) -> PathBuf {
    let sub = path.join(name);
    if sub.is_dir() {
        sub
    } else {
        path.to_path_buf()
    }
}

/// Runs `op` until it succeeds or the policy's attempts are used up, waiting
/// the policy's delay in between. `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(_) if attempt < policy.attempts() => {
                tokio::time::sleep(policy.delay()).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

pub struct DiscParser<M> {
    config: Config,
    media: M,
}

impl<M: MediaInfoSource> DiscParser<M> {
    pub fn new(config: Config, media: M) -> Self {
        DiscParser { config, media }
    }

    fn work_dir(&self) -> &Path {
        &self.config.paths.work_dir
    }

    /// Processes every disc in order and returns how many were analyzed.
    pub async fn process(&self, discs: &mut [Disc], ui: &mut dyn SelectionInterface) -> usize {
        let mut analyzed = 0;
        for (index, disc) in discs.iter_mut().enumerate() {
            match self.process_disc(index, disc, ui).await {
                Ok(()) => analyzed += 1,
                Err(e) => error!(
                    "skipping {} disc {}: {}",
                    disc.format,
                    disc.path.display(),
                    e
                ),
            }
        }
        analyzed
    }

    pub async fn process_disc(
        &self,
        index: usize,
        disc: &mut Disc,
        ui: &mut dyn SelectionInterface,
    ) -> Result<()> {
        match disc.format {
            DiscFormat::BluRay => self.bluray(index, disc, ui).await,
            DiscFormat::Dvd => self.dvd(disc).await,
            DiscFormat::HdDvd => self.hddvd(disc).await,
        }
    }

    /// Selects, scans and parses the playlists of a Blu-ray.
    pub async fn bluray(
        &self,
        disc_index: usize,
        disc: &mut Disc,
        ui: &mut dyn SelectionInterface,
    ) -> Result<()> {
        let candidates = playlist::index_playlists(&disc.path)?;
        let selected = select::select_playlists(&candidates, &self.config.selection, ui)?;
        if selected.is_empty() {
            return Err(Error::NoEligiblePlaylists(disc.path.clone()));
        }
        disc.playlists = selected.clone();

        let scanner = Scanner::new(&self.config.scanner, self.work_dir());
        let mut parsed_any = false;
        for (idx, playlist) in selected.iter().enumerate() {
            let report_path = match scanner.scan(disc_index, &disc.path, playlist).await {
                Ok(path) => path,
                Err(e @ Error::UnsupportedPlatform(_)) => return Err(e),
                Err(e) => {
                    warn!("error scanning playlist {}: {}", playlist.file_name, e);
                    continue;
                }
            };

            let parsed = match self.read_report(&report_path, &disc.path).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("giving up on report {}: {}", report_path.display(), e);
                    continue;
                }
            };
            self.write_summaries(disc_index, idx, &parsed).await?;

            let ParsedReport {
                summary,
                mut bdinfo,
                ..
            } = parsed;
            if selected.len() > 1 {
                self.edition(idx, playlist, &mut bdinfo, ui)?;
            }

            if idx == 0 {
                disc.summary = Some(summary);
                disc.bdinfo = Some(bdinfo);
            } else {
                disc.variants.push(BdInfoVariant {
                    index: idx,
                    summary,
                    bdinfo,
                });
            }
            parsed_any = true;
        }

        if parsed_any {
            Ok(())
        } else {
            let names: Vec<&str> = selected.iter().map(|p| p.file_name.as_str()).collect();
            Err(Error::ScanOutputMissing(names.join(", ")))
        }
    }

    /// Reads and parses a report, re-reading it under the retry policy when
    /// it does not parse. The scanner is not run again.
    pub async fn read_report(&self, path: &Path, disc_path: &Path) -> Result<ParsedReport> {
        if !path.exists() {
            return Err(Error::ScanOutputMissing(path.display().to_string()));
        }

        retry(&self.config.retry, |attempt| async move {
            let bytes = tokio::fs::read(path).await?;
            let parsed = report::parse_report(&String::from_utf8_lossy(&bytes), disc_path);
            if let Err(e) = &parsed {
                warn!("attempt {} at {} failed: {}", attempt, path.display(), e);
            }
            parsed
        })
        .await
    }

    async fn write_summaries(
        &self,
        disc_index: usize,
        idx: usize,
        parsed: &ParsedReport,
    ) -> Result<()> {
        let (summary, extended) = summary_paths(self.work_dir(), disc_index, idx);
        tokio::fs::write(&summary, parsed.summary.trim()).await?;
        tokio::fs::write(&extended, parsed.extended_summary.trim()).await?;
        Ok(())
    }

    fn edition(
        &self,
        idx: usize,
        playlist: &Playlist,
        bdinfo: &mut BdInfoResult,
        ui: &mut dyn SelectionInterface,
    ) -> Result<()> {
        let current = bdinfo
            .label
            .clone()
            .unwrap_or_else(|| format!("Playlist {}", idx));
        info!("current label for playlist {}: {}", playlist.file_name, current);

        if !self.config.selection.is_interactive() {
            info!("unattended mode: custom edition not added");
            return Ok(());
        }
        let reply = ui.edition_label(playlist, &current)?;
        if let Some(edition) = reply.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            info!("edition updated to: {}", edition);
            bdinfo.edition = Some(edition);
        }
        Ok(())
    }

    /// Finds the main title set of a DVD.
    pub async fn dvd(&self, disc: &mut Disc) -> Result<()> {
        let dir = subdir_or_self(&disc.path, "VIDEO_TS");
        let set = dvd::analyze(&dir, &self.media).await?;
        info!(
            "{}: title set {} ({})",
            disc.path.display(),
            set.set_id,
            set.size_class
        );
        disc.title_set = Some(set);
        Ok(())
    }

    /// Finds the main feature of an HD-DVD.
    pub async fn hddvd(&self, disc: &mut Disc) -> Result<()> {
        let dir = subdir_or_self(&disc.path, "HVDVD_TS");
        disc.hddvd = Some(hddvd::analyze(&dir, &self.media).await?);
        Ok(())
    }
}
