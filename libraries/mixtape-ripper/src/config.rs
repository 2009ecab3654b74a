use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, RipError};
use crate::path_template::PathTemplate;
use crate::profile::{EncoderKind, EncodingProfile, RipQuality};
use crate::types::{OverwritePolicy, ParanoiaLevel};

/// Settings for one rip pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipConfig {
    /// Root the filename template resolves under
    pub library_root: PathBuf,
    pub template: PathTemplate,
    pub encoder: EncoderKind,
    pub quality: RipQuality,
    /// Use VBR for MP3 at medium and high quality
    pub mp3_vbr: bool,
    pub paranoia: ParanoiaLevel,
    pub overwrite: OverwritePolicy,
    /// Jobs encoding at the same time; drive reads stay one at a time
    pub max_concurrent_jobs: usize,
    pub eject_after: bool,
    /// Run after every job finished, with the ripped files as arguments
    pub post_process: Option<PathBuf>,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("music"),
            template: PathTemplate::default(),
            encoder: EncoderKind::default(),
            quality: RipQuality::default(),
            mp3_vbr: true,
            paranoia: ParanoiaLevel::default(),
            overwrite: OverwritePolicy::default(),
            max_concurrent_jobs: 2,
            eject_after: false,
            post_process: None,
        }
    }
}

impl RipConfig {
    pub fn profile(&self) -> EncodingProfile {
        EncodingProfile::resolve(self.encoder, self.quality, self.mp3_vbr)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(RipError::Configuration(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }

        let template = self.template.template();
        if template.trim().is_empty() {
            return Err(RipError::Configuration("filename template is empty".to_string()));
        }
        // Without a per-track token every track resolves to the same file
        if !template.contains("{Title}") && !template.contains("{TrackNo}") {
            return Err(RipError::Configuration(format!(
                "filename template '{}' needs {{Title}} or {{TrackNo}}",
                template
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        RipConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_workers() {
        let config = RipConfig {
            max_concurrent_jobs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RipError::Configuration(_))));
    }

    #[test]
    fn rejects_template_without_track_token() {
        let config = RipConfig {
            template: PathTemplate::new("{Artist}/{Album}"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
