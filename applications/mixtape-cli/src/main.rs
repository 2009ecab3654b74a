//! Mixtape - local music library, smart playlists and CD ripping

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mixtape_cli::commands::{self, RipOutcome, RipRequest};
use mixtape_cli::AppConfig;
use mixtape_core::Track;
use mixtape_playback::ShuffleMode;
use mixtape_ripper::{AlbumInfo, OverwritePolicy, RipStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mixtape")]
#[command(about = "Music library, smart playlists and CD ripper", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./mixtape.toml when present)
    #[arg(short, long, env = "MIXTAPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import tracks from a JSON array file
    Import { file: PathBuf },

    /// List the catalog
    Tracks,

    /// Evaluate a smart playlist definition against the catalog
    Evaluate { playlist: PathBuf },

    /// Evaluate a smart playlist and print it in play order
    Shuffle {
        playlist: PathBuf,

        /// Shuffle mode (defaults to the configured one)
        #[arg(short, long, value_enum)]
        mode: Option<ShuffleArg>,
    },

    /// Manage stored smart playlists
    Smartlists {
        #[command(subcommand)]
        action: SmartlistAction,
    },

    /// Inspect or clear saved playback sessions
    Resume {
        #[command(subcommand)]
        action: ResumeAction,
    },

    /// Rip the disc in the configured drive
    Rip {
        #[arg(long, default_value = "Unknown Artist")]
        artist: String,

        #[arg(long, default_value = "Unknown Album")]
        album: String,

        #[arg(long, default_value = "")]
        genre: String,

        #[arg(long)]
        year: Option<u32>,

        /// Album artist for compilations; per-track artists come from CD-Text
        #[arg(long)]
        compilation: Option<String>,

        /// Track titles in disc order
        #[arg(long = "title")]
        titles: Vec<String>,

        /// Replace tracks already ripped from this disc
        #[arg(long)]
        overwrite: bool,

        /// Print the planned jobs without ripping
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum SmartlistAction {
    /// Store a definition from a JSON file
    Save { file: PathBuf },
    /// List stored definitions by category
    List,
}

#[derive(Subcommand)]
enum ResumeAction {
    /// Show the saved session for a context
    Show { context: String },
    /// Forget the saved session for a context
    Clear { context: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShuffleArg {
    Off,
    Random,
    Album,
    Artist,
    Smart,
}

impl From<ShuffleArg> for ShuffleMode {
    fn from(arg: ShuffleArg) -> Self {
        match arg {
            ShuffleArg::Off => ShuffleMode::Off,
            ShuffleArg::Random => ShuffleMode::Random,
            ShuffleArg::Album => ShuffleMode::Album,
            ShuffleArg::Artist => ShuffleMode::Artist,
            ShuffleArg::Smart => ShuffleMode::Smart,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixtape=info,mixtape_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let pool = commands::open_database(&config.storage.database_url).await?;

    match cli.command {
        Commands::Import { file } => {
            let count = commands::import_tracks(&pool, &file).await?;
            println!("Imported {count} tracks");
        }

        Commands::Tracks => {
            let catalog = commands::load_catalog(&pool).await?;
            let snapshot = mixtape_core::Catalog::snapshot(catalog.as_ref());
            for track in snapshot.iter() {
                print_track(track);
            }
            println!("{} tracks", snapshot.len());
        }

        Commands::Evaluate { playlist } => {
            let playlist = commands::load_playlist(&playlist)?;
            let matched = commands::evaluate(&pool, &playlist).await?;
            print_tracks(&matched);
        }

        Commands::Shuffle { playlist, mode } => {
            let playlist = commands::load_playlist(&playlist)?;
            let mode = mode.map_or(config.playback.shuffle, ShuffleMode::from);
            let ordered = commands::shuffle(&pool, &playlist, mode, &config.playback.weights).await?;
            print_tracks(&ordered);
        }

        Commands::Smartlists { action } => match action {
            SmartlistAction::Save { file } => {
                let playlist = commands::load_playlist(&file)?;
                commands::save_smartlist(&pool, &playlist).await?;
                println!("Saved {}/{}", playlist.category, playlist.name);
            }
            SmartlistAction::List => {
                let library = commands::smartlist_library(&pool).await?;
                for category in library.categories() {
                    println!("{category}");
                    for playlist in library.playlists(category) {
                        println!("  {}", playlist.name);
                    }
                }
            }
        },

        Commands::Resume { action } => match action {
            ResumeAction::Show { context } => {
                let context = commands::parse_context(&context)?;
                match commands::resume_report(&pool, &config, context).await? {
                    Some(report) => {
                        println!("{}", serde_json::to_string_pretty(&report.state)?);
                        println!(
                            "mode: {:?}, {} of {} queued tracks still in the catalog",
                            report.mode,
                            report.resolvable,
                            report.state.queue.len().max(usize::from(report.state.track_id.is_some())),
                        );
                    }
                    None => println!("No saved session for {context}"),
                }
            }
            ResumeAction::Clear { context } => {
                let context = commands::parse_context(&context)?;
                commands::clear_resume(&pool, context).await?;
            }
        },

        Commands::Rip {
            artist,
            album,
            genre,
            year,
            compilation,
            titles,
            overwrite,
            dry_run,
        } => {
            let request = RipRequest {
                album: AlbumInfo {
                    artist,
                    album,
                    genre,
                    year,
                    compilation_artist: compilation,
                    titles,
                },
                overwrite: if overwrite {
                    OverwritePolicy::Confirm
                } else {
                    OverwritePolicy::Skip
                },
                dry_run,
            };

            match commands::rip(&pool, &config, request).await? {
                RipOutcome::Planned(jobs) => {
                    for job in jobs {
                        println!(
                            "track {:02}: {} ({})",
                            job.track_number(),
                            job.destination.display(),
                            job.profile.encoder
                        );
                    }
                }
                RipOutcome::Finished(summary) => {
                    println!(
                        "Disc {}: {} ripped, {} skipped, {} failed, {} cancelled in {}s",
                        summary.disc_id,
                        summary.done(),
                        summary.count(RipStatus::SkippedDuplicate),
                        summary.count(RipStatus::Failed),
                        summary.count(RipStatus::Cancelled),
                        summary.duration_seconds
                    );
                }
            }
        }
    }

    pool.close().await;
    Ok(())
}

fn print_track(track: &Track) {
    println!(
        "{}\t{} - {}\t[{}]\trating {}\tplays {}",
        track.id,
        track.album_artist(),
        track.title,
        track.album,
        track.rating,
        track.play_count
    );
}

fn print_tracks(tracks: &[Arc<Track>]) {
    for track in tracks {
        print_track(track);
    }
    println!("{} tracks", tracks.len());
}
