//! Technical metadata extraction for optical disc backups.
//!
//! Given a directory holding the contents of a Blu-ray, DVD or HD-DVD, this
//! crate finds the main feature and collects what is known about it: video,
//! audio and subtitle tracks, sizes, durations and edition labels.
//!
//! * Blu-rays: movie playlists (MPLS) are decoded with [`Mpls`], the eligible
//!   ones are chosen through a [`SelectionInterface`], scanned with an external
//!   BDInfo executable and the resulting report is parsed into a
//!   [`BdInfoResult`].
//! * DVDs: VOB files are grouped into title sets and the main set is picked by
//!   duration (see [`dvd`]).
//! * HD-DVDs: the XPL playlist under `ADV_OBJ` is read and the longest title
//!   wins, with the largest EVO file as a fallback (see [`hddvd`]).
//!
//! [`DiscParser`] drives all three, one disc at a time.
//!
//! # Examples
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> discinfo::Result<()> {
//! use discinfo::{
//!     config::Config, mediainfo::MediaInfoCli, pipeline::DiscParser, select::Unattended, Disc,
//!     DiscFormat,
//! };
//!
//! let config = Config::from_file("discinfo.toml")?;
//! let media = MediaInfoCli::new(&config.mediainfo);
//! let parser = DiscParser::new(config, media);
//!
//! let mut discs = vec![Disc::new("/mnt/disc", DiscFormat::BluRay)];
//! parser.process(&mut discs, &mut Unattended).await;
//! if let Some(bdinfo) = &discs[0].bdinfo {
//!     println!("{} ({:?} GiB)", bdinfo.playlist, bdinfo.size_gib);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Mpls`]: mpls/struct.Mpls.html
//! [`SelectionInterface`]: select/trait.SelectionInterface.html
//! [`BdInfoResult`]: types/struct.BdInfoResult.html
//! [`DiscParser`]: pipeline/struct.DiscParser.html
pub mod config;
pub mod dvd;
mod error;
pub mod hddvd;
pub mod mediainfo;
pub mod mpls;
mod parser;
pub mod pipeline;
pub mod playlist;
pub mod report;
pub mod scan;
pub mod select;
pub mod types;

pub use error::{Error, MplsError, Result};
pub use mpls::Mpls;
pub use types::*;
