use mixtape_core::MixtapeError;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::{JobId, RipStatus};

/// Errors that can occur while ripping a disc
#[derive(Error, Debug)]
pub enum RipError {
    #[error("Drive error: {0}")]
    Device(String),

    /// The drive is fine but this track could not be read
    #[error("Unreadable track: {0}")]
    Read(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Permission denied writing {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid status change for job {job}: {from} -> {to}")]
    InvalidTransition {
        job: JobId,
        from: RipStatus,
        to: RipStatus,
    },

    /// A job hit an error that stops the whole rip
    #[error("Rip aborted at track {track} (job {job}): {source}")]
    Aborted {
        job: JobId,
        track: u32,
        #[source]
        source: Box<RipError>,
    },

    #[error("Post-processing script failed: {0}")]
    PostProcess(String),

    #[error("Invalid rip configuration: {0}")]
    Configuration(String),

    #[error("Rip worker failed: {0}")]
    Worker(String),

    #[error("Rip was cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] MixtapeError),
}

impl RipError {
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Map an I/O error on `path`, keeping permission failures distinct
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this error stops every remaining job, not just the one that hit it
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Device(_) | Self::PermissionDenied { .. } | Self::Aborted { .. } => true,
            Self::Core(err) => matches!(err, MixtapeError::Device(_) | MixtapeError::Storage(_)),
            _ => false,
        }
    }
}

impl From<RipError> for MixtapeError {
    fn from(err: RipError) -> Self {
        let message = err.to_string();
        match err {
            RipError::Core(inner) => inner,
            RipError::Device(_) | RipError::Read(_) => MixtapeError::Device(message),
            RipError::Encoder(_) | RipError::PostProcess(_) => MixtapeError::Encoder(message),
            RipError::Io { source, .. } => MixtapeError::Io(source),
            RipError::Configuration(_) => MixtapeError::Configuration(message),
            RipError::Cancelled => MixtapeError::Cancelled,
            RipError::Aborted { source, .. } => match MixtapeError::from(*source) {
                MixtapeError::Device(_) => MixtapeError::Device(message),
                other => other,
            },
            _ => MixtapeError::InvalidInput(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, RipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_fatal() {
        let err = RipError::io(
            "/music/a.flac",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, RipError::PermissionDenied { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn other_io_errors_are_per_job() {
        let err = RipError::io(
            "/music/a.flac",
            std::io::Error::new(std::io::ErrorKind::WriteZero, "short write"),
        );
        assert!(!err.is_fatal());
        assert!(matches!(MixtapeError::from(err), MixtapeError::Io(_)));
    }

    #[test]
    fn converts_into_core_taxonomy() {
        assert!(matches!(
            MixtapeError::from(RipError::device("no disc")),
            MixtapeError::Device(_)
        ));
        assert!(matches!(
            MixtapeError::from(RipError::encoder("lame crashed")),
            MixtapeError::Encoder(_)
        ));
        assert!(matches!(MixtapeError::from(RipError::Cancelled), MixtapeError::Cancelled));
    }
}
