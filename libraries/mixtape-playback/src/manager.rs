//! Playback manager - core orchestration
//!
//! Coordinates queue, history, shuffle, track loading and session resume.

use chrono::Utc;
use mixtape_core::{PlaybackContext, ResumeMode, ResumeState, TrackId};
use std::cmp::Ordering;
use std::time::Duration;

use crate::{
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    history::History,
    loader::TrackLoader,
    queue::{Queue, QueueEntry},
    resume::ResumeTarget,
    shuffle::shuffle_queue,
    source::AudioSource,
    types::{PlaybackConfig, PlaybackState, QueueTrack, RepeatMode, ShuffleMode},
    weighted::WeightProfile,
};

/// Playback state machine
///
/// ```text
/// Stopped ──play──▶ Loading ──loaded──▶ Playing ◀──▶ Paused
///                      │                   │
///                    failed              stop
///                      ▼                   ▼
///                   Failed ──next / end──▶ Stopped
/// ```
///
/// Track loading goes through a [`TrackLoader`] when one is set; without one
/// the manager parks in `Loading` until the platform calls
/// [`set_audio_source`](Self::set_audio_source) or
/// [`load_failed`](Self::load_failed).
pub struct PlaybackManager {
    state: PlaybackState,
    current_track: Option<QueueTrack>,
    queue: Queue,
    history: History,

    shuffle: ShuffleMode,
    repeat: RepeatMode,
    weights: WeightProfile,

    audio_source: Option<Box<dyn AudioSource>>,
    loader: Option<Box<dyn TrackLoader>>,

    /// Offset applied when the current track's source arrives
    pending_seek: Option<Duration>,

    consecutive_failures: u32,
    max_consecutive_failures: u32,
    restart_threshold: Duration,

    /// Last track whose source was installed
    last_started: Option<TrackId>,

    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackManager {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            state: PlaybackState::Stopped,
            current_track: None,
            queue: Queue::new(),
            history: History::new(config.history_size),
            shuffle: config.shuffle,
            repeat: config.repeat,
            weights: config.weights,
            audio_source: None,
            loader: None,
            pending_seek: None,
            consecutive_failures: 0,
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            restart_threshold: config.restart_threshold,
            last_started: None,
            pending_events: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: impl TrackLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn set_loader(&mut self, loader: Box<dyn TrackLoader>) {
        self.loader = Some(loader);
    }

    // ===== Playback Control =====

    /// Start or resume playback
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused if self.audio_source.is_some() => {
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
            PlaybackState::Paused | PlaybackState::Loading => self.load_current(),
            PlaybackState::Stopped | PlaybackState::Failed => {
                if self.current_track.is_none() {
                    let track = self.get_next_track_from_queue()?;
                    self.current_track = Some(track);
                }
                self.load_current()
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.set_state(PlaybackState::Paused);
        }
    }

    /// Stop playback
    ///
    /// Clears the current track but keeps the queue.
    pub fn stop(&mut self) {
        self.current_track = None;
        self.audio_source = None;
        self.pending_seek = None;
        self.set_state(PlaybackState::Stopped);
    }

    /// Skip to next track
    ///
    /// A manual skip always advances, even with repeat-track on.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        if let Some(track) = self.current_track.take() {
            self.history.push(track);
        }
        self.audio_source = None;
        self.pending_seek = None;

        match self.get_next_track_from_queue() {
            Ok(track) => {
                self.current_track = Some(track);
                self.load_current()
            }
            Err(err) => {
                self.set_state(PlaybackState::Stopped);
                Err(err)
            }
        }
    }

    /// Go to previous track
    ///
    /// Past the restart threshold (3s by default) this restarts the current
    /// track instead.
    pub fn previous(&mut self) -> Result<()> {
        if let Some(source) = self.audio_source.as_mut() {
            if source.position() > self.restart_threshold {
                return source.reset();
            }
        }
        self.skip(-1)
    }

    /// Move `n` tracks forward, or `-n` tracks back through history
    ///
    /// `skip(0)` restarts the current track. Going back further than the
    /// history reaches stops at the oldest remembered track.
    pub fn skip(&mut self, n: i32) -> Result<()> {
        match n.cmp(&0) {
            Ordering::Equal => self.restart_current(),
            Ordering::Greater => {
                let steps = n.unsigned_abs() as usize;
                if steps == 1 {
                    self.next()
                } else {
                    self.skip_to_queue_index(steps - 1)
                }
            }
            Ordering::Less => {
                let mut moved = false;
                for _ in 0..n.unsigned_abs() {
                    let Some(prev) = self.history.pop() else {
                        break;
                    };
                    if let Some(current) = self.current_track.take() {
                        self.requeue(current);
                    }
                    self.current_track = Some(prev);
                    moved = true;
                }

                if !moved {
                    return self.restart_current();
                }
                self.audio_source = None;
                self.pending_seek = None;
                self.load_current()
            }
        }
    }

    /// Skip to an upcoming track
    ///
    /// Only the current track goes to history; skipped-over tracks were
    /// never played.
    pub fn skip_to_queue_index(&mut self, index: usize) -> Result<()> {
        if index >= self.queue.len() {
            return Err(PlaybackError::IndexOutOfBounds(index));
        }

        if let Some(track) = self.current_track.take() {
            self.history.push(track);
        }
        self.audio_source = None;
        self.pending_seek = None;

        self.queue
            .skip_to_index(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        let track = self.get_next_track_from_queue()?;
        self.current_track = Some(track);
        self.load_current()
    }

    fn restart_current(&mut self) -> Result<()> {
        match self.audio_source.as_mut() {
            Some(source) => source.reset(),
            None if self.current_track.is_some() => {
                self.pending_seek = None;
                Ok(())
            }
            None => Err(PlaybackError::NoTrackLoaded),
        }
    }

    /// Put a track that is being backed out of in front of the queue again
    fn requeue(&mut self, track: QueueTrack) {
        if !self.queue.un_consume(&track.id) {
            self.queue.add_next(track);
        }
    }

    /// Next track considering repeat mode
    fn get_next_track_from_queue(&mut self) -> Result<QueueTrack> {
        if let Some(track) = self.queue.pop_next() {
            return Ok(track);
        }

        match self.repeat {
            RepeatMode::All if self.queue.has_source() => {
                tracing::debug!("Queue finished, starting over");
                self.queue.reload_source(self.shuffle, &self.weights);
                if self.shuffle != ShuffleMode::Off {
                    self.pending_events.push(PlaybackEvent::QueueReshuffled);
                }
                self.queue.pop_next().ok_or(PlaybackError::QueueEmpty)
            }
            _ => Err(PlaybackError::QueueEmpty),
        }
    }

    // ===== Track loading =====

    /// Open the current track, skipping over tracks that fail to load
    fn load_current(&mut self) -> Result<()> {
        loop {
            let Some(track) = self.current_track.clone() else {
                self.set_state(PlaybackState::Stopped);
                return Err(PlaybackError::QueueEmpty);
            };
            self.set_state(PlaybackState::Loading);

            let Some(loader) = self.loader.as_mut() else {
                return Ok(());
            };

            match loader.load(&track) {
                Ok(source) => {
                    self.install_source(source);
                    return Ok(());
                }
                Err(err) => {
                    if !self.handle_load_failure(&track, &err.to_string())? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Count a failed load and move to the next track
    ///
    /// Returns `Ok(true)` when another track is ready to load, `Ok(false)`
    /// when the queue ran out.
    fn handle_load_failure(&mut self, track: &QueueTrack, message: &str) -> Result<bool> {
        self.consecutive_failures += 1;
        let failures = self.consecutive_failures;

        tracing::warn!(
            track_id = %track.id,
            path = %track.path.display(),
            failures,
            "Failed to load track: {}",
            message
        );

        self.audio_source = None;
        self.pending_seek = None;
        self.set_state(PlaybackState::Failed);
        self.pending_events.push(PlaybackEvent::TrackFailed {
            track_id: track.id.clone(),
            message: message.to_string(),
            consecutive_failures: failures,
        });

        if failures >= self.max_consecutive_failures {
            tracing::error!(failures, last_track = %track.id, "Giving up on playback");
            self.consecutive_failures = 0;
            self.stop();
            return Err(PlaybackError::SourceUnreachable {
                failures,
                last_track: track.id.clone(),
            });
        }

        self.current_track = None;
        match self.get_next_track_from_queue() {
            Ok(next) => {
                self.current_track = Some(next);
                Ok(true)
            }
            Err(_) => {
                self.stop();
                Ok(false)
            }
        }
    }

    fn install_source(&mut self, mut source: Box<dyn AudioSource>) {
        if let Some(offset) = self.pending_seek.take() {
            let duration = source.duration();
            if duration.is_zero() || offset <= duration {
                if let Err(err) = source.seek(offset) {
                    tracing::warn!("Could not seek to {:?}: {}", offset, err);
                }
            } else {
                tracing::warn!(?offset, ?duration, "Stored offset past end of track, starting from the top");
            }
        }

        self.consecutive_failures = 0;
        self.audio_source = Some(source);

        if let Some(track_id) = self.current_track.as_ref().map(|t| t.id.clone()) {
            let previous_track_id = self.last_started.replace(track_id.clone());
            self.pending_events.push(PlaybackEvent::TrackChanged {
                track_id,
                previous_track_id,
            });
        }
        self.set_state(PlaybackState::Playing);
    }

    /// Hand over an opened source for the current track
    ///
    /// Used by platforms that load tracks themselves.
    pub fn set_audio_source(&mut self, source: Box<dyn AudioSource>) -> Result<()> {
        if self.current_track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        self.install_source(source);
        Ok(())
    }

    /// Report that the platform could not open the current track
    pub fn load_failed(&mut self, message: &str) -> Result<()> {
        let track = self
            .current_track
            .clone()
            .ok_or(PlaybackError::NoTrackLoaded)?;
        if self.handle_load_failure(&track, message)? {
            self.load_current()
        } else {
            Ok(())
        }
    }

    /// Natural end of the current track
    pub fn on_track_finished(&mut self) -> Result<()> {
        let Some(track) = self.current_track.clone() else {
            return Ok(());
        };
        self.pending_events.push(PlaybackEvent::TrackFinished {
            track_id: track.id.clone(),
        });

        if self.repeat == RepeatMode::Track {
            if let Some(source) = self.audio_source.as_mut() {
                source.reset()?;
                self.set_state(PlaybackState::Playing);
                return Ok(());
            }
        }

        self.history.push(track);
        self.current_track = None;
        self.audio_source = None;

        match self.get_next_track_from_queue() {
            Ok(next) => {
                self.current_track = Some(next);
                self.load_current()
            }
            Err(PlaybackError::QueueEmpty) => {
                self.stop();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Advance when the playing source has run out
    pub fn tick(&mut self) -> Result<()> {
        let finished = self.state == PlaybackState::Playing
            && self.audio_source.as_ref().is_some_and(|s| s.is_finished());
        if finished {
            self.on_track_finished()
        } else {
            Ok(())
        }
    }

    // ===== Seek =====

    /// Seek within the current track
    ///
    /// While the track is still loading the offset is applied once it opens.
    pub fn seek(&mut self, offset: Duration) -> Result<()> {
        if let Some(source) = self.audio_source.as_mut() {
            if offset > source.duration() {
                return Err(PlaybackError::InvalidSeekPosition(offset));
            }
            source.seek(offset)
        } else if self.current_track.is_some() {
            self.pending_seek = Some(offset);
            Ok(())
        } else {
            Err(PlaybackError::NoTrackLoaded)
        }
    }

    pub fn seek_to_percent(&mut self, percent: f32) -> Result<()> {
        let percent = percent.clamp(0.0, 1.0);
        let duration = self
            .audio_source
            .as_ref()
            .map(|s| s.duration())
            .ok_or(PlaybackError::NoTrackLoaded)?;
        self.seek(duration.mul_f32(percent))
    }

    // ===== Queue Management =====

    /// Add track to play next (top of explicit queue)
    pub fn add_to_queue_next(&mut self, track: QueueTrack) {
        self.queue.add_next(track);
        self.emit_queue_changed();
    }

    pub fn add_to_queue_end(&mut self, track: QueueTrack) {
        self.queue.add_to_end(track);
        self.emit_queue_changed();
    }

    /// Replace the source queue and forget history
    pub fn load_queue(&mut self, tracks: Vec<QueueTrack>) {
        self.queue.set_source(tracks);
        if self.shuffle != ShuffleMode::Off {
            self.queue.reshuffle_remaining(self.shuffle, &self.weights);
        }
        self.history.clear();
        self.emit_queue_changed();
    }

    /// Append tracks to the source queue
    ///
    /// With shuffle on, only the appended tracks are shuffled.
    pub fn append_to_queue(&mut self, mut tracks: Vec<QueueTrack>) {
        shuffle_queue(&mut tracks, self.shuffle, &self.weights);
        self.queue.append_to_source(tracks);
        self.emit_queue_changed();
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Result<QueueTrack> {
        let track = self
            .queue
            .remove(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        self.emit_queue_changed();
        Ok(track)
    }

    pub fn reorder_queue(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue
            .reorder(from, to)
            .map_err(PlaybackError::InvalidOperation)?;
        self.emit_queue_changed();
        Ok(())
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.emit_queue_changed();
    }

    /// Upcoming tracks
    pub fn get_queue(&self) -> Vec<&QueueTrack> {
        self.queue.get_all()
    }

    /// Source queue with played flags
    pub fn queue_entries(&self) -> Vec<QueueEntry> {
        self.queue.entries()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // ===== Shuffle & Repeat =====

    /// Change shuffle mode
    ///
    /// Only upcoming tracks move; turning shuffle off restores their
    /// insertion order.
    pub fn set_shuffle(&mut self, mode: ShuffleMode) {
        if self.shuffle == mode {
            return;
        }
        self.shuffle = mode;
        self.queue.reshuffle_remaining(mode, &self.weights);
        self.pending_events.push(PlaybackEvent::QueueReshuffled);
    }

    /// Draw a fresh order for the upcoming tracks
    pub fn reshuffle(&mut self) {
        if self.shuffle == ShuffleMode::Off {
            return;
        }
        self.queue.reshuffle_remaining(self.shuffle, &self.weights);
        self.pending_events.push(PlaybackEvent::QueueReshuffled);
    }

    pub fn get_shuffle(&self) -> ShuffleMode {
        self.shuffle
    }

    /// New weights apply from the next shuffle
    pub fn set_weights(&mut self, weights: WeightProfile) {
        self.weights = weights;
    }

    pub fn get_weights(&self) -> &WeightProfile {
        &self.weights
    }

    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn get_repeat(&self) -> RepeatMode {
        self.repeat
    }

    // ===== State Queries =====

    pub fn get_state(&self) -> PlaybackState {
        self.state
    }

    pub fn get_current_track(&self) -> Option<&QueueTrack> {
        self.current_track.as_ref()
    }

    pub fn get_position(&self) -> Duration {
        self.audio_source
            .as_ref()
            .map(|s| s.position())
            .unwrap_or(Duration::ZERO)
    }

    pub fn get_duration(&self) -> Option<Duration> {
        self.audio_source.as_ref().map(|s| s.duration())
    }

    /// Offset waiting for the current track to load
    pub fn pending_seek(&self) -> Option<Duration> {
        self.pending_seek
    }

    /// Oldest first
    pub fn get_history(&self) -> Vec<&QueueTrack> {
        self.history.get_all()
    }

    pub fn has_next(&self) -> bool {
        !self.queue.is_empty() || (self.repeat == RepeatMode::All && self.queue.has_source())
    }

    pub fn has_previous(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    // ===== Session =====

    /// Snapshot of the session for the resume store
    pub fn session_state(&self, context: PlaybackContext) -> ResumeState {
        let position = match self.audio_source {
            Some(ref source) => source.position(),
            None => self.pending_seek.unwrap_or_default(),
        };

        ResumeState {
            context,
            track_id: self.current_track.as_ref().map(|t| t.id.clone()),
            position_ms: position.as_millis() as u64,
            queue: self
                .queue
                .source_tracks()
                .iter()
                .map(|t| t.id.clone())
                .collect(),
            saved_at: Utc::now(),
        }
    }

    /// Clean stop: capture the session, then stop
    pub fn shutdown(&mut self, context: PlaybackContext) -> ResumeState {
        let state = self.session_state(context);
        tracing::info!(
            context = %context,
            track_id = ?state.track_id,
            position_ms = state.position_ms,
            "Playback session ended"
        );
        self.stop();
        state
    }

    /// Rebuild a stored session
    ///
    /// `tracks` is the stored queue resolved against the catalog, in stored
    /// play order. Nothing starts playing; the next `play()` opens the cued
    /// track. A stored track that no longer exists falls back to the first
    /// track (radio falls back to nothing), and an offset past the track's
    /// known duration falls back to the track start.
    pub fn restore_session(
        &mut self,
        tracks: Vec<QueueTrack>,
        state: Option<&ResumeState>,
        mode: ResumeMode,
    ) -> ResumeTarget {
        self.stop();
        self.history.clear();
        self.queue.clear();
        self.queue.set_source(tracks);
        self.emit_queue_changed();

        let Some(state) = state else {
            return ResumeTarget::Fresh;
        };

        let mode = mode.effective_for(state.context);
        let stored = state.track_id.as_ref().and_then(|id| {
            self.queue
                .source_tracks()
                .iter()
                .position(|t| &t.id == id)
        });

        let target = match (mode, stored) {
            (ResumeMode::Off, _) => ResumeTarget::Fresh,
            (ResumeMode::ExactTrack | ResumeMode::ExactPosition, Some(index)) => {
                let offset = state.position();
                let duration = self.queue.source_tracks()[index].duration;
                let seekable = !offset.is_zero() && (duration.is_zero() || offset < duration);

                if mode == ResumeMode::ExactPosition && seekable {
                    ResumeTarget::Position { index, offset }
                } else {
                    ResumeTarget::Track { index }
                }
            }
            (ResumeMode::ExactTrack | ResumeMode::ExactPosition, None) => {
                tracing::warn!(
                    track_id = ?state.track_id,
                    context = %state.context,
                    "Stored track is gone, falling back"
                );
                if state.context == PlaybackContext::Radio {
                    ResumeTarget::Fresh
                } else {
                    ResumeTarget::FirstTrack
                }
            }
            (ResumeMode::FirstTrack, _) => ResumeTarget::FirstTrack,
        };

        let cued = match target {
            ResumeTarget::Fresh => true,
            ResumeTarget::FirstTrack => self.cue(0),
            ResumeTarget::Track { index } => self.cue(index),
            ResumeTarget::Position { index, offset } => {
                let cued = self.cue(index);
                self.pending_seek = Some(offset);
                cued
            }
        };

        if cued {
            target
        } else {
            ResumeTarget::Fresh
        }
    }

    /// Make the source track at `position` current without starting it
    fn cue(&mut self, position: usize) -> bool {
        if !self.queue.seek_source(position) {
            return false;
        }
        match self.queue.pop_next() {
            Some(track) => {
                self.current_track = Some(track);
                true
            }
            None => false,
        }
    }

    // ===== Events =====

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    pub fn emit_position_update(&mut self) {
        if let Some(ref source) = self.audio_source {
            self.pending_events.push(PlaybackEvent::PositionUpdate {
                position_ms: source.position().as_millis() as u64,
                duration_ms: source.duration().as_millis() as u64,
            });
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.pending_events.push(PlaybackEvent::StateChanged { state });
        }
    }

    fn emit_queue_changed(&mut self) {
        self.pending_events.push(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
    }
}

impl Default for PlaybackManager {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}
