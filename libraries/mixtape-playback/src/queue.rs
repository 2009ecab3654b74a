//! Two-tier queue system
//!
//! - Explicit queue: user-added tracks that play next
//! - Source queue: tracks from the playlist, album or station being played
//!
//! Indices taken by the public methods count upcoming tracks only: the
//! explicit queue first, then the unplayed part of the source queue.

use mixtape_core::TrackId;
use serde::{Deserialize, Serialize};

use crate::shuffle::{apply_order, next_order};
use crate::types::{QueueTrack, ShuffleMode};
use crate::weighted::WeightProfile;

/// Two-tier queue for playback
///
/// ```text
/// Currently Playing: Track A
/// ─────────────────────────────
/// Explicit Queue (play next):
///   - Track B (user added)
/// ─────────────────────────────
/// Source Queue (index-navigated):
///   - Track C  (played)
///   - Track D  <- source_index
///   - Track E
/// ```
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Tracks explicitly added by user (play next)
    explicit: Vec<QueueTrack>,

    /// Tracks from source, in play order
    source: Vec<QueueTrack>,

    /// Next unplayed position in `source`
    source_index: usize,

    /// Insertion sequence number of each `source` slot, for turning
    /// shuffle off. Kept parallel to `source`.
    source_origin: Vec<usize>,

    /// Sequence number for the next appended source track
    next_origin: usize,

    is_shuffled: bool,
}

/// One source queue slot, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub track: QueueTrack,
    /// Position in the source queue
    pub position: usize,
    pub played: bool,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add track to the front of the explicit queue
    pub fn add_next(&mut self, track: QueueTrack) {
        self.explicit.insert(0, track);
    }

    /// Add track to end of explicit queue
    pub fn add_to_end(&mut self, track: QueueTrack) {
        self.explicit.push(track);
    }

    /// Replace the source queue
    ///
    /// `tracks` must be in insertion order; shuffling happens afterwards.
    pub fn set_source(&mut self, tracks: Vec<QueueTrack>) {
        self.source_origin = (0..tracks.len()).collect();
        self.next_origin = tracks.len();
        self.source = tracks;
        self.source_index = 0;
        self.is_shuffled = false;
    }

    /// Append tracks to source queue
    pub fn append_to_source(&mut self, tracks: Vec<QueueTrack>) {
        let start = self.next_origin;
        self.next_origin += tracks.len();
        self.source_origin.extend(start..self.next_origin);
        self.source.extend(tracks);
    }

    /// Remove an upcoming track
    pub fn remove(&mut self, index: usize) -> Option<QueueTrack> {
        if index >= self.len() {
            return None;
        }

        if index < self.explicit.len() {
            return Some(self.explicit.remove(index));
        }

        let position = self.source_index + index - self.explicit.len();
        self.source_origin.remove(position);
        Some(self.source.remove(position))
    }

    /// Move an upcoming track within its tier
    pub fn reorder(&mut self, from_index: usize, to_index: usize) -> Result<(), String> {
        let total = self.len();
        if from_index >= total || to_index >= total {
            return Err("Index out of bounds".to_string());
        }

        if from_index == to_index {
            return Ok(());
        }

        let explicit_len = self.explicit.len();

        if from_index < explicit_len && to_index < explicit_len {
            let track = self.explicit.remove(from_index);
            self.explicit.insert(to_index, track);
            Ok(())
        } else if from_index >= explicit_len && to_index >= explicit_len {
            let from_source = self.source_index + from_index - explicit_len;
            let to_source = self.source_index + to_index - explicit_len;
            let track = self.source.remove(from_source);
            self.source.insert(to_source, track);
            let origin = self.source_origin.remove(from_source);
            self.source_origin.insert(to_source, origin);
            Ok(())
        } else {
            Err("Cannot move tracks between explicit and source queues".to_string())
        }
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.explicit.clear();
        self.source.clear();
        self.source_index = 0;
        self.source_origin.clear();
        self.next_origin = 0;
        self.is_shuffled = false;
    }

    /// Take the next track
    ///
    /// The explicit queue is consumed; the source queue only advances its
    /// cursor so `go_back` can return to played tracks.
    pub fn pop_next(&mut self) -> Option<QueueTrack> {
        if !self.explicit.is_empty() {
            return Some(self.explicit.remove(0));
        }

        let track = self.source.get(self.source_index)?.clone();
        self.source_index += 1;
        Some(track)
    }

    pub fn peek_next(&self) -> Option<&QueueTrack> {
        self.explicit
            .first()
            .or_else(|| self.source.get(self.source_index))
    }

    /// Upcoming tracks: explicit queue, then the unplayed source
    pub fn get_all(&self) -> Vec<&QueueTrack> {
        self.explicit
            .iter()
            .chain(self.source.iter().skip(self.source_index))
            .collect()
    }

    pub fn get(&self, index: usize) -> Option<&QueueTrack> {
        let explicit_len = self.explicit.len();
        if index < explicit_len {
            self.explicit.get(index)
        } else {
            self.source.get(self.source_index + index - explicit_len)
        }
    }

    /// Number of upcoming tracks
    pub fn len(&self) -> usize {
        self.explicit.len() + self.source.len().saturating_sub(self.source_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether there is any source material at all, played or not
    pub fn has_source(&self) -> bool {
        !self.source.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.is_shuffled
    }

    /// Every source slot with its played flag
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.source
            .iter()
            .enumerate()
            .map(|(position, track)| QueueEntry {
                track: track.clone(),
                position,
                played: position < self.source_index,
            })
            .collect()
    }

    /// Source queue in play order
    pub fn source_tracks(&self) -> &[QueueTrack] {
        &self.source
    }

    /// Shuffle the unplayed part of the source queue
    ///
    /// Played tracks keep their positions.
    pub fn reshuffle_remaining(&mut self, mode: ShuffleMode, weights: &WeightProfile) {
        if mode == ShuffleMode::Off {
            self.restore_original_order();
            return;
        }

        let start = self.source_index;
        let order = next_order(&self.source[start..], weights, mode);
        apply_order(&mut self.source[start..], &order);
        let origins: Vec<usize> = order.iter().map(|&i| self.source_origin[start + i]).collect();
        self.source_origin[start..].copy_from_slice(&origins);
        self.is_shuffled = true;
    }

    /// Put the unplayed part of the source queue back in insertion order
    pub fn restore_original_order(&mut self) {
        if !self.is_shuffled {
            return;
        }

        self.sort_by_origin(self.source_index);
        self.is_shuffled = false;
    }

    /// Sort `source[start..]` back into insertion order
    fn sort_by_origin(&mut self, start: usize) {
        let mut slots: Vec<(usize, QueueTrack)> = self
            .source_origin
            .drain(start..)
            .zip(self.source.drain(start..))
            .collect();
        slots.sort_by_key(|(origin, _)| *origin);

        for (origin, track) in slots {
            self.source_origin.push(origin);
            self.source.push(track);
        }
    }

    /// Restart the source queue from the top (repeat all)
    ///
    /// Reshuffles when shuffle is on.
    pub fn reload_source(&mut self, mode: ShuffleMode, weights: &WeightProfile) {
        self.sort_by_origin(0);
        self.source_index = 0;
        self.is_shuffled = false;

        if mode != ShuffleMode::Off {
            self.reshuffle_remaining(mode, weights);
        }
    }

    /// Advance so the upcoming track at `index` plays next
    ///
    /// Returns the tracks skipped over, or `None` when out of range.
    pub fn skip_to_index(&mut self, index: usize) -> Option<Vec<QueueTrack>> {
        if index >= self.len() {
            return None;
        }

        let explicit_len = self.explicit.len();
        if index < explicit_len {
            return Some(self.explicit.drain(..index).collect());
        }

        let mut skipped: Vec<QueueTrack> = self.explicit.drain(..).collect();
        let end = self.source_index + index - explicit_len;
        skipped.extend(self.source[self.source_index..end].iter().cloned());
        self.source_index = end;
        Some(skipped)
    }

    /// Move the source cursor to an absolute source position
    pub fn seek_source(&mut self, position: usize) -> bool {
        if position > self.source.len() {
            return false;
        }
        self.source_index = position;
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.source_index > 0
    }

    /// Un-consume the last source track
    pub fn go_back(&mut self) -> Option<QueueTrack> {
        if self.source_index == 0 {
            return None;
        }
        self.source_index -= 1;
        Some(self.source[self.source_index].clone())
    }

    /// Step the source cursor back over `id` if it was the last source track
    /// handed out
    pub fn un_consume(&mut self, id: &TrackId) -> bool {
        match self.source_index.checked_sub(1) {
            Some(last) if self.source[last].id == *id => {
                self.source_index = last;
                true
            }
            _ => false,
        }
    }

    /// Next unplayed position in the source queue
    pub fn current_source_index(&self) -> usize {
        self.source_index
    }
}
