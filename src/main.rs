//! Command line front end: analyzes the given disc directories in order.
use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use discinfo::{
    config::Config,
    mediainfo::MediaInfoCli,
    pipeline::{self, DiscParser},
    select::SelectionInterface,
    Disc, DiscFormat, Playlist,
};
use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Disc directories, processed in the order given
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Auto)]
    format: Format,

    /// Configuration file
    #[arg(short, long, default_value = "discinfo.toml")]
    config: PathBuf,

    /// Directory for scanner reports and summaries
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Never prompt
    #[arg(long)]
    unattended: bool,

    /// Always scan only the largest playlist
    #[arg(long)]
    use_largest: bool,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Auto,
    Bluray,
    Dvd,
    Hddvd,
}

/// Asks on the terminal.
struct Console;

impl Console {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }
}

impl SelectionInterface for Console {
    fn choose_playlists(&mut self, candidates: &[Playlist]) -> io::Result<String> {
        println!("Available playlists:");
        for (i, playlist) in candidates.iter().enumerate() {
            println!("  {}: {}", i, playlist.describe());
        }
        self.ask("Playlists to scan (comma separated, ALL, or empty for the largest): ")
    }

    fn edition_label(&mut self, playlist: &Playlist, current: &str) -> io::Result<Option<String>> {
        println!("{} is labelled \"{}\"", playlist.file_name, current.trim());
        let reply = self.ask("Edition name (empty to keep): ")?;
        Ok(Some(reply).filter(|r| !r.is_empty()))
    }

    fn invalid_reply(&mut self, reply: &str) {
        println!("Could not understand {:?}, please try again.", reply);
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("discinfo={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn disc_format(path: &Path, format: Format) -> anyhow::Result<DiscFormat> {
    Ok(match format {
        Format::Bluray => DiscFormat::BluRay,
        Format::Dvd => DiscFormat::Dvd,
        Format::Hddvd => DiscFormat::HdDvd,
        Format::Auto => match pipeline::detect_format(path) {
            Some(format) => format,
            None => bail!("cannot tell the disc format of {}", path.display()),
        },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        Config::from_file(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        Config::default()
    };
    if let Some(work_dir) = args.work_dir {
        config.paths.work_dir = work_dir;
    }
    config.selection.unattended |= args.unattended;
    config.selection.use_largest_playlist |= args.use_largest;

    init_logging(&config.logging.level);
    tracing::info!("discinfo v{} starting", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.paths.work_dir)
        .await
        .with_context(|| format!("creating {}", config.paths.work_dir.display()))?;

    let mut discs = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        discs.push(Disc::new(path, disc_format(path, args.format)?));
    }

    let media = MediaInfoCli::new(&config.mediainfo);
    let parser = DiscParser::new(config, media);
    let analyzed = parser.process(&mut discs, &mut Console).await;
    tracing::info!("{} of {} discs analyzed", analyzed, discs.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&discs)?);
    } else {
        for disc in &discs {
            print_disc(disc);
        }
    }
    Ok(())
}

fn print_disc(disc: &Disc) {
    println!("== {} ({})", disc.path.display(), disc.format);
    if let Some(bdinfo) = &disc.bdinfo {
        println!("  playlist {} - {}", bdinfo.playlist, bdinfo.length);
        if let Some(edition) = &bdinfo.edition {
            println!("  edition: {}", edition);
        }
        for video in &bdinfo.video {
            println!("  video: {} {} {}", video.codec, video.resolution, video.fps);
        }
        for audio in &bdinfo.audio {
            println!("  audio: {} {} {}", audio.language, audio.codec, audio.channels);
        }
        for variant in &disc.variants {
            println!(
                "  variant {}: playlist {} {}",
                variant.index,
                variant.bdinfo.playlist,
                variant.bdinfo.edition.as_deref().unwrap_or("")
            );
        }
    }
    if let Some(set) = &disc.title_set {
        println!(
            "  title set {} - {:.0}s - {:.2} GiB ({})",
            set.set_id, set.duration_seconds, set.size_gib, set.size_class
        );
    }
    if let Some(hd) = &disc.hddvd {
        println!("  {} titles, main file {}", hd.titles.len(), hd.evo_path.display());
    }
}
