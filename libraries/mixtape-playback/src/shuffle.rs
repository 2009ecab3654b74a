//! Shuffle algorithms for queue randomization
//!
//! Every mode produces a permutation of queue positions; the queue applies it.
//! - Random: Fisher-Yates
//! - Album / Artist: shuffles whole groups, each group keeps its own order
//! - Smart: weighted by rating, play count, recency and chance

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{QueueTrack, ShuffleMode};
use crate::weighted::{WeightProfile, WeightedSampler};

/// Permutation of `tracks` for the given mode
///
/// `order[k]` is the index of the track that plays k-th.
pub fn next_order(tracks: &[QueueTrack], weights: &WeightProfile, mode: ShuffleMode) -> Vec<usize> {
    next_order_with(tracks, weights, mode, Utc::now(), &mut thread_rng())
}

/// [`next_order`] with an explicit clock and random source
pub fn next_order_with<R: Rng + ?Sized>(
    tracks: &[QueueTrack],
    weights: &WeightProfile,
    mode: ShuffleMode,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<usize> {
    match mode {
        ShuffleMode::Off => (0..tracks.len()).collect(),
        ShuffleMode::Random => {
            let mut order: Vec<usize> = (0..tracks.len()).collect();
            order.shuffle(rng);
            order
        }
        ShuffleMode::Album => shuffle_blocks(tracks, album_key, rng),
        ShuffleMode::Artist => shuffle_blocks(tracks, |t| t.artist.to_lowercase(), rng),
        ShuffleMode::Smart => smart_order(tracks, weights, now, rng),
    }
}

/// Shuffle a slice of tracks in place
pub fn shuffle_queue(tracks: &mut [QueueTrack], mode: ShuffleMode, weights: &WeightProfile) {
    if mode == ShuffleMode::Off {
        return;
    }
    let order = next_order(tracks, weights, mode);
    apply_order(tracks, &order);
}

/// Reorder `tracks` so position k holds the former `tracks[order[k]]`
pub(crate) fn apply_order(tracks: &mut [QueueTrack], order: &[usize]) {
    let reordered: Vec<QueueTrack> = order.iter().map(|&i| tracks[i].clone()).collect();
    tracks.clone_from_slice(&reordered);
}

fn album_key(track: &QueueTrack) -> String {
    format!(
        "{}\u{1f}{}",
        track.album_artist.to_lowercase(),
        track.album.as_deref().unwrap_or_default().to_lowercase()
    )
}

/// Shuffle groups of tracks sharing a key
///
/// Groups appear in first-seen order before shuffling; within a group the
/// queue order is kept.
fn shuffle_blocks<R, F>(tracks: &[QueueTrack], key: F, rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
    F: Fn(&QueueTrack) -> String,
{
    let mut blocks: Vec<Vec<usize>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (i, track) in tracks.iter().enumerate() {
        let slot = *by_key.entry(key(track)).or_insert_with(|| {
            blocks.push(Vec::new());
            blocks.len() - 1
        });
        blocks[slot].push(i);
    }

    blocks.shuffle(rng);
    blocks.into_iter().flatten().collect()
}

/// Weighted order
///
/// Without a random component the profile is a ranking: tracks sort by
/// descending score and only equal scores are shuffled among themselves.
/// With one, tracks are drawn proportionally to score.
fn smart_order<R: Rng + ?Sized>(
    tracks: &[QueueTrack],
    weights: &WeightProfile,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<usize> {
    let Some([w_rating, w_plays, w_recency, w_random]) = weights.normalized() else {
        return (0..tracks.len()).collect();
    };

    let base = base_scores(tracks, [w_rating, w_plays, w_recency], now);

    if w_random == 0.0 {
        let mut order: Vec<usize> = (0..tracks.len()).collect();
        order.shuffle(rng);
        // Stable sort keeps the shuffled order among ties
        order.sort_by(|&a, &b| base[b].partial_cmp(&base[a]).unwrap_or(Ordering::Equal));
        return order;
    }

    let scores: Vec<f64> = base
        .iter()
        .map(|score| score + w_random * rng.gen::<f64>())
        .collect();

    WeightedSampler::new(&scores).into_order(rng)
}

/// Deterministic part of each track's score, each factor in [0, 1]
fn base_scores(tracks: &[QueueTrack], [w_rating, w_plays, w_recency]: [f64; 3], now: DateTime<Utc>) -> Vec<f64> {
    let max_plays = tracks.iter().map(|t| t.play_count).max().unwrap_or(0);
    let elapsed: Vec<Option<f64>> = tracks
        .iter()
        .map(|t| {
            t.last_played
                .map(|at| (now - at).num_milliseconds().max(0) as f64)
        })
        .collect();
    let max_elapsed = elapsed.iter().flatten().copied().fold(0.0_f64, f64::max);

    tracks
        .iter()
        .zip(&elapsed)
        .map(|(track, elapsed)| {
            let rating = track.rating.normalized();
            let plays = if max_plays == 0 {
                1.0
            } else {
                1.0 - f64::from(track.play_count) / f64::from(max_plays)
            };
            let recency = match elapsed {
                None => 1.0,
                Some(_) if max_elapsed <= 0.0 => 0.0,
                Some(e) => e / max_elapsed,
            };
            w_rating * rating + w_plays * plays + w_recency * recency
        })
        .collect()
}
