//! Encoders backed by `lame`, `oggenc` and `flac`, fed WAV over stdin

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::debug;

use crate::error::{Result, RipError};
use crate::profile::{BitrateMode, EncoderKind, EncodingProfile};
use crate::traits::{AudioEncoder, EncodeSession};
use crate::types::TrackTags;

#[derive(Debug, Clone)]
pub struct CommandEncoder {
    lame: PathBuf,
    oggenc: PathBuf,
    flac: PathBuf,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self {
            lame: PathBuf::from("lame"),
            oggenc: PathBuf::from("oggenc"),
            flac: PathBuf::from("flac"),
        }
    }
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lame(mut self, path: impl Into<PathBuf>) -> Self {
        self.lame = path.into();
        self
    }

    pub fn with_oggenc(mut self, path: impl Into<PathBuf>) -> Self {
        self.oggenc = path.into();
        self
    }

    pub fn with_flac(mut self, path: impl Into<PathBuf>) -> Self {
        self.flac = path.into();
        self
    }

    /// Program and arguments that encode stdin into `output`
    pub fn command_line(&self, output: &Path, profile: &EncodingProfile, tags: &TrackTags) -> (PathBuf, Vec<OsString>) {
        let mut args: Vec<OsString> = Vec::new();
        let track_number = tags.track_number.to_string();

        let program = match profile.encoder {
            EncoderKind::Flac => {
                args.push("--silent".into());
                args.push("--force".into());
                args.push(format!("-{}", profile.compression_level.unwrap_or(5)).into());
                args.push("-o".into());
                args.push(output.into());
                for (key, value) in vorbis_comments(tags) {
                    args.push(format!("--tag={}={}", key, value).into());
                }
                args.push("-".into());
                &self.flac
            }
            EncoderKind::Vorbis => {
                args.push("--quiet".into());
                args.push("-q".into());
                args.push(profile.vbr_level.unwrap_or(5).to_string().into());
                args.push("-o".into());
                args.push(output.into());
                for (key, value) in vorbis_comments(tags) {
                    args.push("-c".into());
                    args.push(format!("{}={}", key, value).into());
                }
                args.push("-".into());
                &self.oggenc
            }
            EncoderKind::Mp3 => {
                args.push("--quiet".into());
                match profile.mode {
                    BitrateMode::Cbr => {
                        args.push("-b".into());
                        args.push(profile.bitrate_kbps.unwrap_or(192).to_string().into());
                    }
                    _ => {
                        args.push("-V".into());
                        args.push(profile.vbr_level.unwrap_or(4).to_string().into());
                    }
                }
                args.push("--add-id3v2".into());
                let frames = [
                    ("--tt", tags.title.as_str()),
                    ("--ta", tags.artist.as_str()),
                    ("--tl", tags.album.as_str()),
                    ("--tg", tags.genre.as_str()),
                    ("--tn", track_number.as_str()),
                ];
                for (flag, value) in frames {
                    if !value.is_empty() {
                        args.push(flag.into());
                        args.push(value.into());
                    }
                }
                if let Some(year) = tags.year {
                    args.push("--ty".into());
                    args.push(year.to_string().into());
                }
                args.push("-".into());
                args.push(output.into());
                &self.lame
            }
        };

        (program.clone(), args)
    }
}

fn vorbis_comments(tags: &TrackTags) -> Vec<(&'static str, String)> {
    let mut comments = vec![
        ("TITLE", tags.title.clone()),
        ("ARTIST", tags.artist.clone()),
        ("ALBUM", tags.album.clone()),
        ("TRACKNUMBER", tags.track_number.to_string()),
    ];
    if let Some(album_artist) = &tags.album_artist {
        comments.push(("ALBUMARTIST", album_artist.clone()));
    }
    if !tags.genre.is_empty() {
        comments.push(("GENRE", tags.genre.clone()));
    }
    if let Some(year) = tags.year {
        comments.push(("DATE", year.to_string()));
    }
    comments.retain(|(_, value)| !value.is_empty());
    comments
}

#[async_trait]
impl AudioEncoder for CommandEncoder {
    async fn start(
        &self,
        output: &Path,
        profile: &EncodingProfile,
        tags: &TrackTags,
    ) -> Result<Box<dyn EncodeSession>> {
        let (program, args) = self.command_line(output, profile, tags);
        debug!(program = %program.display(), output = %output.display(), "Starting encoder");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RipError::encoder(format!("cannot run {}: {}", program.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RipError::encoder(format!("{} stdin unavailable", program.display())))?;

        Ok(Box::new(CommandSession {
            program,
            child,
            stdin: Some(stdin),
        }))
    }
}

struct CommandSession {
    program: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
}

#[async_trait]
impl EncodeSession for CommandSession {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RipError::encoder(format!("{} input already closed", self.program.display())))?;
        stdin
            .write_all(chunk)
            .await
            .map_err(|e| RipError::encoder(format!("{}: {}", self.program.display(), e)))
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let CommandSession { program, child, stdin } = *self;
        // Closing stdin signals end of input
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RipError::encoder(format!("{}: {}", program.display(), e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RipError::encoder(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn abort(mut self: Box<Self>) {
        drop(self.stdin.take());
        if let Err(e) = self.child.kill().await {
            debug!("Encoder already exited: {}", e);
        }
    }
}
