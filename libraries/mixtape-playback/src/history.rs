//! Bounded record of played tracks, used by `previous`

use mixtape_core::TrackId;
use std::collections::VecDeque;

use crate::types::QueueTrack;

/// Ring buffer of played tracks, most recent at the back
#[derive(Debug, Clone)]
pub struct History {
    tracks: VecDeque<QueueTrack>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Record a played track, discarding the oldest when full
    pub fn push(&mut self, track: QueueTrack) {
        if self.max_size == 0 {
            return;
        }
        while self.tracks.len() >= self.max_size {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track);
    }

    pub fn peek(&self) -> Option<&QueueTrack> {
        self.tracks.back()
    }

    pub fn pop(&mut self) -> Option<QueueTrack> {
        self.tracks.pop_back()
    }

    /// Oldest first
    pub fn get_all(&self) -> Vec<&QueueTrack> {
        self.tracks.iter().collect()
    }

    /// Ids of played tracks, oldest first
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Shrinking drops the oldest entries
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.tracks.len() > max_size {
            self.tracks.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}
