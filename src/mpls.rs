//! The subset of the movie playlist (MPLS) format needed to size and time a
//! Blu-ray playlist.
//!
//! Only the header and the play item table are decoded. Stream number tables,
//! sub-paths, marks and extension data are skipped by length, which keeps the
//! decoder tolerant of playlist versions it has never seen.
use crate::parser::parse_mpls;
use crate::MplsError;
use std::{fmt::Debug, io::Read};

/// A decoded movie playlist.
#[derive(Debug, Clone)]
pub struct Mpls {
    pub header: Header,
    pub play_list: PlayList,
}

/// The fixed-size header at the start of every MPLS file.
///
/// `play_list_start` is the absolute byte offset of the [`PlayList`] block.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: String,
    pub play_list_start: u32,
    pub play_list_mark_start: u32,
    pub extension_data_start: u32,
}

#[derive(Debug, Clone)]
pub struct PlayList {
    pub play_items: Vec<PlayItem>,
    pub sub_path_count: u16,
}

#[derive(Debug, Clone)]
pub struct PlayItem {
    pub clip: Clip,
    pub is_multi_angle: bool,
    pub in_time: TimeStamp,
    pub out_time: TimeStamp,
}

/// A clip file, also known as a segment.
///
/// This identifies the playable stream file. `file_name` consists of 5 numbers
/// (e.g. "00055"), and `codec_id` of 4 letters which will usually be "M2TS" on
/// blu-rays.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub file_name: String,
    pub codec_id: String,
}

/// A time stamp, relative to some System Time Clock sequence, expressed in 45 KHz.
///
/// To get a floating-point value in seconds, you can use the [`seconds`] method.
///
/// [`seconds`]: #method.seconds
#[derive(Copy, Clone, PartialEq)]
pub struct TimeStamp(pub u32);

/// Ticks per second of every MPLS time stamp.
pub const TIME_BASE: f64 = 45_000f64;

impl TimeStamp {
    /// Returns this time stamp in units of seconds.
    pub fn seconds(&self) -> f64 {
        (self.0 as f64) / TIME_BASE
    }
}

impl Debug for TimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeStamp")
            .field("raw", &self.0)
            .field("secs", &self.seconds())
            .finish()
    }
}

impl Mpls {
    /// Attempts to parse a movie playlist from the given reader.
    pub fn from<R: Read>(mut reader: R) -> Result<Mpls, MplsError> {
        let bytes = {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            buffer
        };

        Mpls::parse(&bytes)
    }

    /// Parses a movie playlist that is already in memory.
    pub fn parse(bytes: &[u8]) -> Result<Mpls, MplsError> {
        if !bytes.starts_with(b"MPLS") {
            return Err(MplsError::NotMpls);
        }
        parse_mpls(bytes)
            .map_err(|_| MplsError::Parse)
            .map(|(_, m)| m)
    }

    /// Sum of all play item durations, in seconds.
    ///
    /// # Examples
    /// ```
    /// use discinfo::mpls::{Clip, Header, Mpls, PlayItem, PlayList, TimeStamp};
    ///
    /// let item = |i, o| PlayItem {
    ///     clip: Clip { file_name: "00001".into(), codec_id: "M2TS".into() },
    ///     is_multi_angle: false,
    ///     in_time: TimeStamp(i),
    ///     out_time: TimeStamp(o),
    /// };
    /// let mpls = Mpls {
    ///     header: Header {
    ///         version: "0200".into(),
    ///         play_list_start: 58,
    ///         play_list_mark_start: 0,
    ///         extension_data_start: 0,
    ///     },
    ///     play_list: PlayList {
    ///         play_items: vec![item(0, 45_000 * 60), item(90_000, 90_000 + 45_000 * 30)],
    ///         sub_path_count: 0,
    ///     },
    /// };
    /// assert_eq!(mpls.duration_seconds(), 90.0);
    /// ```
    pub fn duration_seconds(&self) -> f64 {
        self.play_list
            .play_items
            .iter()
            .map(|p| p.out_time.seconds() - p.in_time.seconds())
            .sum()
    }

    /// The clip referenced by each play item, in play order.
    pub fn clips(&self) -> Vec<&Clip> {
        self.play_list.play_items.iter().map(|p| &p.clip).collect()
    }
}
