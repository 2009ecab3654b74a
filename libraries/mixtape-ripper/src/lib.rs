//! Mixtape - CD Ripper
//!
//! Rips audio CDs into the library: one job per disc track, moving through
//! `Pending → Ripping → Encoding → Tagging → Done`.
//!
//! This crate provides:
//! - Duplicate detection against the catalog by disc fingerprint
//! - Encoder/quality resolution (Vorbis, MP3, FLAC)
//! - Filename templates with sanitization
//! - Bounded concurrent encoding with serialized drive reads
//! - Cooperative cancellation and progress events
//! - `cdparanoia` and `lame`/`oggenc`/`flac` backed collaborators
//!
//! # Example
//!
//! ```rust,no_run
//! use mixtape_ripper::{AlbumInfo, CdParanoiaDrive, CommandEncoder, RipConfig, RipPipeline};
//! use mixtape_storage::MemoryCatalog;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = RipPipeline::new(
//!     Arc::new(CdParanoiaDrive::new("/dev/cdrom")),
//!     Arc::new(CommandEncoder::new()),
//!     Arc::new(MemoryCatalog::new()),
//!     RipConfig::default(),
//! )?;
//!
//! let disc = pipeline.scan().await?;
//! let album = AlbumInfo {
//!     artist: "The Band".to_string(),
//!     album: "Live".to_string(),
//!     ..Default::default()
//! };
//!
//! let (mut events, handle) = pipeline.start(pipeline.plan(&disc, &album));
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! let summary = handle.await??;
//! println!("{} tracks ripped", summary.done());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod external;
pub mod path_template;
mod pipeline;
pub mod profile;
mod traits;
mod types;

pub use config::RipConfig;
pub use error::{Result, RipError};
pub use external::{parse_toc, CdParanoiaDrive, CommandEncoder};
pub use path_template::PathTemplate;
pub use pipeline::RipPipeline;
pub use profile::{BitrateMode, EncoderKind, EncodingProfile, RipQuality};
pub use traits::{AudioEncoder, CancelFlag, EncodeSession, OpticalDrive, TrackReader};
pub use types::{
    AlbumInfo, JobId, OverwritePolicy, ParanoiaLevel, RipEvent, RipJob, RipStatus, RipSummary,
    TrackTags,
};
