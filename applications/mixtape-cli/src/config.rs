/// Application configuration
use crate::error::{CliError, Result};
use mixtape_core::{PlaybackContext, ResumeMode};
use mixtape_playback::{PlaybackConfig, RepeatMode, ShuffleMode, WeightProfile};
use mixtape_ripper::{
    EncoderKind, OverwritePolicy, ParanoiaLevel, PathTemplate, RipConfig, RipQuality,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "mixtape.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,

    #[serde(default = "default_ripper")]
    pub ripper: RipperSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_restart_threshold_secs")]
    pub restart_threshold_secs: u64,

    #[serde(default)]
    pub shuffle: ShuffleMode,

    #[serde(default)]
    pub repeat: RepeatMode,

    #[serde(default)]
    pub weights: WeightProfile,

    #[serde(default = "default_resume")]
    pub resume: ResumeSettings,
}

/// Resume mode per playback context
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResumeSettings {
    #[serde(default = "default_main_player_resume")]
    pub main_player: ResumeMode,

    #[serde(default)]
    pub playlist_editor: ResumeMode,

    #[serde(default = "default_radio_resume")]
    pub radio: ResumeMode,
}

impl ResumeSettings {
    pub fn mode_for(&self, context: PlaybackContext) -> ResumeMode {
        match context {
            PlaybackContext::MainPlayer => self.main_player,
            PlaybackContext::PlaylistEditor => self.playlist_editor,
            PlaybackContext::Radio => self.radio,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RipperSettings {
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,

    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default)]
    pub replace_whitespace: bool,

    #[serde(default)]
    pub encoder: EncoderKind,

    #[serde(default)]
    pub quality: RipQuality,

    #[serde(default = "default_enabled")]
    pub mp3_vbr: bool,

    #[serde(default)]
    pub paranoia: ParanoiaLevel,

    #[serde(default)]
    pub eject: bool,

    #[serde(default)]
    pub post_process: Option<PathBuf>,

    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    #[serde(default = "default_device")]
    pub device: PathBuf,

    #[serde(default = "default_tools")]
    pub tools: ToolPaths,
}

/// External programs used by the ripper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolPaths {
    #[serde(default = "default_cdparanoia")]
    pub cdparanoia: PathBuf,

    #[serde(default = "default_eject")]
    pub eject: PathBuf,

    #[serde(default = "default_lame")]
    pub lame: PathBuf,

    #[serde(default = "default_oggenc")]
    pub oggenc: PathBuf,

    #[serde(default = "default_flac")]
    pub flac: PathBuf,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `mixtape.toml`; a missing default file is not an
    /// error, a missing explicit one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. MIXTAPE_STORAGE__DATABASE_URL
        settings = settings.add_source(
            config::Environment::with_prefix("MIXTAPE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(CliError::Config(
                "database URL is required (set MIXTAPE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        if self.playback.max_consecutive_failures == 0 {
            return Err(CliError::Config(
                "playback.max_consecutive_failures must be at least 1".to_string(),
            ));
        }

        self.rip_config(OverwritePolicy::Skip)
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            history_size: self.playback.history_size,
            shuffle: self.playback.shuffle,
            repeat: self.playback.repeat,
            weights: self.playback.weights,
            max_consecutive_failures: self.playback.max_consecutive_failures,
            restart_threshold: Duration::from_secs(self.playback.restart_threshold_secs),
        }
    }

    pub fn rip_config(&self, overwrite: OverwritePolicy) -> RipConfig {
        let ripper = &self.ripper;
        RipConfig {
            library_root: ripper.library_path.clone(),
            template: PathTemplate::new(ripper.template.clone())
                .with_whitespace_replacement(ripper.replace_whitespace),
            encoder: ripper.encoder,
            quality: ripper.quality,
            mp3_vbr: ripper.mp3_vbr,
            paranoia: ripper.paranoia,
            overwrite,
            max_concurrent_jobs: ripper.max_concurrent_jobs,
            eject_after: ripper.eject,
            post_process: ripper.post_process.clone(),
        }
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/mixtape.db".to_string()
}

fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        history_size: default_history_size(),
        max_consecutive_failures: default_max_consecutive_failures(),
        restart_threshold_secs: default_restart_threshold_secs(),
        shuffle: ShuffleMode::default(),
        repeat: RepeatMode::default(),
        weights: WeightProfile::default(),
        resume: default_resume(),
    }
}

fn default_history_size() -> usize {
    50
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_restart_threshold_secs() -> u64 {
    3
}

fn default_resume() -> ResumeSettings {
    ResumeSettings {
        main_player: default_main_player_resume(),
        playlist_editor: ResumeMode::default(),
        radio: default_radio_resume(),
    }
}

fn default_main_player_resume() -> ResumeMode {
    ResumeMode::ExactPosition
}

fn default_radio_resume() -> ResumeMode {
    ResumeMode::ExactTrack
}

fn default_ripper() -> RipperSettings {
    RipperSettings {
        library_path: default_library_path(),
        template: default_template(),
        replace_whitespace: false,
        encoder: EncoderKind::default(),
        quality: RipQuality::default(),
        mp3_vbr: default_enabled(),
        paranoia: ParanoiaLevel::default(),
        eject: false,
        post_process: None,
        max_concurrent_jobs: default_max_concurrent_jobs(),
        device: default_device(),
        tools: default_tools(),
    }
}

fn default_library_path() -> PathBuf {
    PathBuf::from("./data/music")
}

fn default_template() -> String {
    mixtape_ripper::path_template::DEFAULT_TEMPLATE.to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_device() -> PathBuf {
    PathBuf::from("/dev/cdrom")
}

fn default_tools() -> ToolPaths {
    ToolPaths {
        cdparanoia: default_cdparanoia(),
        eject: default_eject(),
        lame: default_lame(),
        oggenc: default_oggenc(),
        flac: default_flac(),
    }
}

fn default_cdparanoia() -> PathBuf {
    PathBuf::from("cdparanoia")
}

fn default_eject() -> PathBuf {
    PathBuf::from("eject")
}

fn default_lame() -> PathBuf {
    PathBuf::from("lame")
}

fn default_oggenc() -> PathBuf {
    PathBuf::from("oggenc")
}

fn default_flac() -> PathBuf {
    PathBuf::from("flac")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            playback: default_playback(),
            ripper: default_ripper(),
        }
    }
}
