mod disc;
mod ids;
mod resume;
mod snapshot;
mod track;

pub use disc::{cddb_disc_id, Disc, DiscFingerprint, DiscTrack, SECTORS_PER_SECOND};
pub use ids::TrackId;
pub use resume::{PlaybackContext, ResumeMode, ResumeState};
pub use snapshot::CatalogSnapshot;
pub use track::{Rating, Track, TrackUpdate};
