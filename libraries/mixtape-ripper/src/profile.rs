//! Encoder and quality selection
//!
//! | Quality | Vorbis (oggenc `-q`) | MP3 VBR (lame `-V`) | MP3 CBR | FLAC |
//! |---------|----------------------|---------------------|---------|------|
//! | Low     | 3                    | CBR 128 kbps        | 128     | -    |
//! | Medium  | 5                    | 4                   | 192     | -    |
//! | High    | 7                    | 2                   | 256     | -    |
//! | Perfect | FLAC                 | FLAC                | FLAC    | 8    |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    #[default]
    Vorbis,
    Mp3,
    Flac,
}

impl EncoderKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vorbis => "ogg",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vorbis => "vorbis",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        })
    }
}

impl std::str::FromStr for EncoderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vorbis" | "ogg" => Ok(Self::Vorbis),
            "mp3" | "lame" => Ok(Self::Mp3),
            "flac" => Ok(Self::Flac),
            other => Err(format!("unknown encoder: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RipQuality {
    Low,
    #[default]
    Medium,
    High,
    /// Lossless
    Perfect,
}

impl std::str::FromStr for RipQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "perfect" | "lossless" => Ok(Self::Perfect),
            other => Err(format!("unknown quality: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitrateMode {
    Vbr,
    Cbr,
    Lossless,
}

/// Concrete encoder settings for a rip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub encoder: EncoderKind,
    pub quality: RipQuality,
    pub mode: BitrateMode,
    /// oggenc `-q` or lame `-V` level
    pub vbr_level: Option<u8>,
    /// Constant bitrate for CBR MP3
    pub bitrate_kbps: Option<u32>,
    /// FLAC compression level
    pub compression_level: Option<u8>,
}

impl EncodingProfile {
    /// Settings for `encoder` at `quality`
    ///
    /// Perfect quality always produces FLAC, whatever encoder was chosen.
    pub fn resolve(encoder: EncoderKind, quality: RipQuality, mp3_vbr: bool) -> Self {
        let encoder = if quality == RipQuality::Perfect {
            EncoderKind::Flac
        } else {
            encoder
        };

        let base = Self {
            encoder,
            quality,
            mode: BitrateMode::Lossless,
            vbr_level: None,
            bitrate_kbps: None,
            compression_level: None,
        };

        match encoder {
            EncoderKind::Flac => Self {
                compression_level: Some(if quality == RipQuality::Perfect { 8 } else { 5 }),
                ..base
            },
            EncoderKind::Vorbis => Self {
                mode: BitrateMode::Vbr,
                vbr_level: Some(match quality {
                    RipQuality::Low => 3,
                    RipQuality::Medium => 5,
                    RipQuality::High | RipQuality::Perfect => 7,
                }),
                ..base
            },
            EncoderKind::Mp3 if mp3_vbr && quality != RipQuality::Low => Self {
                mode: BitrateMode::Vbr,
                vbr_level: Some(if quality == RipQuality::Medium { 4 } else { 2 }),
                ..base
            },
            EncoderKind::Mp3 => Self {
                mode: BitrateMode::Cbr,
                bitrate_kbps: Some(match quality {
                    RipQuality::Low => 128,
                    RipQuality::Medium => 192,
                    RipQuality::High | RipQuality::Perfect => 256,
                }),
                ..base
            },
        }
    }

    pub fn extension(&self) -> &'static str {
        self.encoder.extension()
    }

    pub fn is_lossless(&self) -> bool {
        self.mode == BitrateMode::Lossless
    }
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self::resolve(EncoderKind::default(), RipQuality::default(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOSSY: [RipQuality; 3] = [RipQuality::Low, RipQuality::Medium, RipQuality::High];

    #[test]
    fn perfect_always_flac() {
        for encoder in [EncoderKind::Vorbis, EncoderKind::Mp3, EncoderKind::Flac] {
            let profile = EncodingProfile::resolve(encoder, RipQuality::Perfect, true);
            assert_eq!(profile.encoder, EncoderKind::Flac);
            assert!(profile.is_lossless());
            assert_eq!(profile.extension(), "flac");
        }
    }

    #[test]
    fn vorbis_always_vbr() {
        for quality in LOSSY {
            for mp3_vbr in [true, false] {
                let profile = EncodingProfile::resolve(EncoderKind::Vorbis, quality, mp3_vbr);
                assert_eq!(profile.mode, BitrateMode::Vbr);
                assert!(profile.vbr_level.is_some());
            }
        }
    }

    #[test]
    fn mp3_vbr_except_low() {
        assert_eq!(EncodingProfile::resolve(EncoderKind::Mp3, RipQuality::Low, true).mode, BitrateMode::Cbr);
        assert_eq!(EncodingProfile::resolve(EncoderKind::Mp3, RipQuality::Medium, true).mode, BitrateMode::Vbr);
        assert_eq!(EncodingProfile::resolve(EncoderKind::Mp3, RipQuality::High, true).vbr_level, Some(2));
    }

    #[test]
    fn mp3_cbr_when_vbr_disabled() {
        for quality in LOSSY {
            let profile = EncodingProfile::resolve(EncoderKind::Mp3, quality, false);
            assert_eq!(profile.mode, BitrateMode::Cbr);
            assert!(profile.bitrate_kbps.is_some());
        }
    }

    #[test]
    fn parses_names() {
        assert_eq!("OGG".parse::<EncoderKind>().unwrap(), EncoderKind::Vorbis);
        assert_eq!("lossless".parse::<RipQuality>().unwrap(), RipQuality::Perfect);
        assert!("wav".parse::<EncoderKind>().is_err());
    }
}
