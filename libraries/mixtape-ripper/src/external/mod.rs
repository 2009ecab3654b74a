//! Collaborators that drive command-line tools

mod cdparanoia;
mod encoder;

pub use cdparanoia::{parse_toc, CdParanoiaDrive};
pub use encoder::CommandEncoder;
