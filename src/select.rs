//! Playlist selection.
//!
//! The core never talks to a terminal. Anything that needs an answer from a
//! person goes through a [`SelectionInterface`], so the same policy runs
//! headless in tests and interactively from the binary.
use crate::{config::SelectionSettings, types::Playlist};
use std::io;
use tracing::{info, warn};

/// The capability to ask a person about playlists.
pub trait SelectionInterface {
    /// Presents the candidates and returns the raw reply: `ALL`, an empty
    /// line, or comma separated indices into `candidates`.
    fn choose_playlists(&mut self, candidates: &[Playlist]) -> io::Result<String>;

    /// Offers to name an edition for `playlist`; `None` keeps `current`.
    fn edition_label(&mut self, playlist: &Playlist, current: &str) -> io::Result<Option<String>>;

    /// Called after a reply could not be understood, before asking again.
    fn invalid_reply(&mut self, _reply: &str) {}
}

/// A [`SelectionInterface`] for runs where nobody is there to answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

impl SelectionInterface for Unattended {
    fn choose_playlists(&mut self, _candidates: &[Playlist]) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no one to choose playlists",
        ))
    }

    fn edition_label(
        &mut self,
        _playlist: &Playlist,
        _current: &str,
    ) -> io::Result<Option<String>> {
        Ok(None)
    }
}

/// A parsed selection reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    All,
    Largest,
    Indices(Vec<usize>),
}

/// Parses a selection reply against `len` candidates.
///
/// Out-of-range indices are dropped. Returns `None` when the reply is not
/// understood or leaves nothing to scan.
pub fn parse_choice(reply: &str, len: usize) -> Option<Choice> {
    let reply = reply.trim();
    if reply.eq_ignore_ascii_case("all") {
        return Some(Choice::All);
    }
    if reply.is_empty() {
        return Some(Choice::Largest);
    }

    let mut indices = Vec::new();
    for part in reply.split(',') {
        let idx: usize = part.trim().parse().ok()?;
        if idx < len {
            indices.push(idx);
        }
    }
    if indices.is_empty() {
        None
    } else {
        Some(Choice::Indices(indices))
    }
}

/// Index of the playlist with the largest total clip size.
///
/// Ties resolve to the first candidate.
pub fn largest(candidates: &[Playlist]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, p) in candidates.iter().enumerate() {
        let size = p.total_size();
        match best {
            Some((_, s)) if s >= size => {}
            _ => best = Some((i, size)),
        }
    }
    best.map(|(i, _)| i)
}

/// Chooses the playlists to scan.
///
/// In order of priority: the `use_largest_playlist` setting, unattended
/// runs, and finally asking through `ui` until a valid reply arrives. The
/// result is empty only if `candidates` is.
pub fn select_playlists(
    candidates: &[Playlist],
    settings: &SelectionSettings,
    ui: &mut dyn SelectionInterface,
) -> io::Result<Vec<Playlist>> {
    let pick_largest = || -> Vec<Playlist> {
        largest(candidates)
            .map(|i| vec![candidates[i].clone()])
            .unwrap_or_default()
    };

    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    if settings.use_largest_playlist {
        info!("auto-selecting the largest playlist based on configuration");
        return Ok(pick_largest());
    }
    if !settings.is_interactive() {
        info!("auto-selecting the largest playlist for an unattended run");
        return Ok(pick_largest());
    }

    loop {
        let reply = ui.choose_playlists(candidates)?;
        match parse_choice(&reply, candidates.len()) {
            Some(Choice::All) => return Ok(candidates.to_vec()),
            Some(Choice::Largest) => {
                info!("selecting the playlist with the largest size");
                return Ok(pick_largest());
            }
            Some(Choice::Indices(indices)) => {
                return Ok(indices.into_iter().map(|i| candidates[i].clone()).collect())
            }
            None => {
                warn!("invalid playlist selection {:?}", reply);
                ui.invalid_reply(&reply);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ClipRef;
    use std::{collections::VecDeque, path::PathBuf};

    /// Replays canned answers.
    #[derive(Default)]
    pub struct Scripted {
        pub replies: VecDeque<String>,
        pub editions: VecDeque<Option<String>>,
        pub prompts: usize,
        pub invalid: usize,
    }

    impl Scripted {
        pub fn new(replies: &[&str]) -> Self {
            Scripted {
                replies: replies.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl SelectionInterface for Scripted {
        fn choose_playlists(&mut self, _candidates: &[Playlist]) -> io::Result<String> {
            self.prompts += 1;
            self.replies
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "out of replies"))
        }

        fn edition_label(&mut self, _p: &Playlist, _current: &str) -> io::Result<Option<String>> {
            Ok(self.editions.pop_front().flatten())
        }

        fn invalid_reply(&mut self, _reply: &str) {
            self.invalid += 1;
        }
    }

    pub fn candidate(name: &str, sizes: &[u64]) -> Playlist {
        Playlist {
            file_name: format!("{}.mpls", name),
            path: PathBuf::from(format!("PLAYLIST/{}.mpls", name)),
            duration_seconds: 600.0,
            clips: sizes
                .iter()
                .map(|&size_bytes| ClipRef {
                    file: PathBuf::from("STREAM/00000.m2ts"),
                    size_bytes,
                })
                .collect(),
        }
    }

    fn candidates() -> Vec<Playlist> {
        vec![
            candidate("00001", &[10, 10]),
            candidate("00002", &[5, 30]),
            candidate("00003", &[35]),
        ]
    }

    #[test]
    fn largest_sums_clip_sizes() {
        assert_eq!(largest(&candidates()), Some(1));
        assert_eq!(largest(&[]), None);
    }

    #[test]
    fn largest_tie_goes_to_first() {
        let c = vec![candidate("00001", &[7]), candidate("00002", &[3, 4])];
        assert_eq!(largest(&c), Some(0));
    }

    #[test]
    fn parse_replies() {
        assert_eq!(parse_choice("ALL", 3), Some(Choice::All));
        assert_eq!(parse_choice(" all ", 3), Some(Choice::All));
        assert_eq!(parse_choice("", 3), Some(Choice::Largest));
        assert_eq!(parse_choice("2, 0", 3), Some(Choice::Indices(vec![2, 0])));
        assert_eq!(parse_choice("0,7", 3), Some(Choice::Indices(vec![0])));
        assert_eq!(parse_choice("7", 3), None);
        assert_eq!(parse_choice("one", 3), None);
        assert_eq!(parse_choice("1,,2", 3), None);
    }

    #[test]
    fn configured_largest_skips_prompt() {
        let settings = SelectionSettings {
            use_largest_playlist: true,
            ..Default::default()
        };
        let mut ui = Scripted::new(&[]);
        let chosen = select_playlists(&candidates(), &settings, &mut ui).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].file_name, "00002.mpls");
        assert_eq!(ui.prompts, 0);
    }

    #[test]
    fn unattended_picks_largest() {
        let settings = SelectionSettings {
            unattended: true,
            ..Default::default()
        };
        let chosen = select_playlists(&candidates(), &settings, &mut Unattended).unwrap();
        assert_eq!(chosen[0].file_name, "00002.mpls");
    }

    #[test]
    fn reprompts_until_valid() {
        let mut ui = Scripted::new(&["x", "9", "2,0"]);
        let chosen =
            select_playlists(&candidates(), &SelectionSettings::default(), &mut ui).unwrap();
        let names: Vec<&str> = chosen.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, &["00003.mpls", "00001.mpls"]);
        assert_eq!(ui.prompts, 3);
        assert_eq!(ui.invalid, 2);
    }

    #[test]
    fn empty_reply_falls_back_to_largest() {
        let mut ui = Scripted::new(&[""]);
        let chosen =
            select_playlists(&candidates(), &SelectionSettings::default(), &mut ui).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].file_name, "00002.mpls");
    }

    #[test]
    fn all_selects_every_candidate() {
        let mut ui = Scripted::new(&["All"]);
        let chosen =
            select_playlists(&candidates(), &SelectionSettings::default(), &mut ui).unwrap();
        assert_eq!(chosen, candidates());
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut ui = Scripted::new(&[]);
        assert!(select_playlists(&candidates(), &SelectionSettings::default(), &mut ui).is_err());
    }
}
