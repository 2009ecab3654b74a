//! Weighted sampling for smart shuffle
//!
//! [`WeightedSampler`] draws indices without replacement with probability
//! proportional to their weight. Weights live in a Fenwick tree so each draw
//! is a binary descent over cumulative weights and each removal is a point
//! update, both `O(log n)`.

use mixtape_core::{MixtapeError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Relative importance of each smart shuffle factor
///
/// Weights are non-negative and only their proportions matter; they are
/// normalized before scoring. An all-zero profile disables weighting and
/// yields insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct WeightProfile {
    rating: f64,
    play_count: f64,
    recency: f64,
    random: f64,
}

#[derive(Serialize, Deserialize)]
struct RawWeights {
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    play_count: f64,
    #[serde(default)]
    recency: f64,
    #[serde(default)]
    random: f64,
}

impl TryFrom<RawWeights> for WeightProfile {
    type Error = MixtapeError;

    fn try_from(raw: RawWeights) -> Result<Self> {
        Self::new(raw.rating, raw.play_count, raw.recency, raw.random)
    }
}

impl From<WeightProfile> for RawWeights {
    fn from(profile: WeightProfile) -> Self {
        Self {
            rating: profile.rating,
            play_count: profile.play_count,
            recency: profile.recency,
            random: profile.random,
        }
    }
}

impl Default for WeightProfile {
    fn default() -> Self {
        Self {
            rating: 0.4,
            play_count: 0.2,
            recency: 0.2,
            random: 0.2,
        }
    }
}

impl WeightProfile {
    /// Build a profile, rejecting negative or non-finite weights
    pub fn new(rating: f64, play_count: f64, recency: f64, random: f64) -> Result<Self> {
        for (name, value) in [
            ("rating", rating),
            ("play_count", play_count),
            ("recency", recency),
            ("random", random),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MixtapeError::configuration(format!(
                    "shuffle weight '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            rating,
            play_count,
            recency,
            random,
        })
    }

    /// Pure ranking by rating
    pub fn rating_only() -> Self {
        Self {
            rating: 1.0,
            play_count: 0.0,
            recency: 0.0,
            random: 0.0,
        }
    }

    /// Uniform chance, no track preference
    pub fn random_only() -> Self {
        Self {
            rating: 0.0,
            play_count: 0.0,
            recency: 0.0,
            random: 1.0,
        }
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn play_count(&self) -> f64 {
        self.play_count
    }

    pub fn recency(&self) -> f64 {
        self.recency
    }

    pub fn random(&self) -> f64 {
        self.random
    }

    /// Weights scaled to sum to one, or `None` when every weight is zero
    ///
    /// Order: rating, play count, recency, random.
    pub fn normalized(&self) -> Option<[f64; 4]> {
        let total = self.rating + self.play_count + self.recency + self.random;
        if total <= 0.0 {
            return None;
        }
        Some([
            self.rating / total,
            self.play_count / total,
            self.recency / total,
            self.random / total,
        ])
    }
}

/// Draws indices without replacement, proportional to weight
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    /// 1-based Fenwick tree of partial sums
    tree: Vec<f64>,
    weights: Vec<f64>,
    total: f64,
    /// Indices with a positive weight that have not been drawn
    positive: usize,
}

impl WeightedSampler {
    /// Negative or non-finite weights count as zero
    pub fn new(weights: &[f64]) -> Self {
        let weights: Vec<f64> = weights
            .iter()
            .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();
        let n = weights.len();

        // Linear-time construction: push each node into its parent
        let mut tree = vec![0.0; n + 1];
        for (i, &w) in weights.iter().enumerate() {
            tree[i + 1] += w;
            let parent = (i + 1) + lowbit(i + 1);
            if parent <= n {
                tree[parent] += tree[i + 1];
            }
        }

        Self {
            tree,
            total: weights.iter().sum(),
            positive: weights.iter().filter(|&&w| w > 0.0).count(),
            weights,
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Remaining weight
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Draw one index, or `None` once every positive weight has been drawn
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.positive == 0 {
            return None;
        }

        let target = rng.gen::<f64>() * self.total;
        let index = match self.find(target) {
            Some(i) if self.weights[i] > 0.0 => i,
            // Rounding can land past the last live slot
            _ => self.weights.iter().rposition(|&w| w > 0.0)?,
        };

        self.remove(index);
        Some(index)
    }

    /// Full draw order: weighted draws, then zero-weight indices in order
    pub fn into_order<R: Rng + ?Sized>(mut self, rng: &mut R) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len());
        while let Some(index) = self.draw(rng) {
            order.push(index);
        }

        let mut drawn = vec![false; self.len()];
        for &i in &order {
            drawn[i] = true;
        }
        order.extend((0..self.len()).filter(|&i| !drawn[i]));
        order
    }

    /// Smallest index whose cumulative weight exceeds `target`
    fn find(&self, target: f64) -> Option<usize> {
        let n = self.weights.len();
        let mut pos = 0;
        let mut remaining = target;
        let mut step = n.checked_next_power_of_two()?;
        if step > n {
            step >>= 1;
        }

        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                pos = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }

        (pos < n).then_some(pos)
    }

    fn remove(&mut self, index: usize) {
        let weight = self.weights[index];
        if weight <= 0.0 {
            return;
        }
        self.weights[index] = 0.0;
        self.positive -= 1;
        self.total = if self.positive == 0 {
            0.0
        } else {
            (self.total - weight).max(0.0)
        };

        let mut i = index + 1;
        while i < self.tree.len() {
            self.tree[i] -= weight;
            i += lowbit(i);
        }
    }
}

fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_negative_weight() {
        assert!(WeightProfile::new(1.0, -0.5, 0.0, 0.0).is_err());
        assert!(WeightProfile::new(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn normalizes_weights() {
        let profile = WeightProfile::new(2.0, 1.0, 1.0, 0.0).unwrap();
        let [r, p, t, x] = profile.normalized().unwrap();
        assert!((r - 0.5).abs() < 1e-12);
        assert!((p - 0.25).abs() < 1e-12);
        assert!((t - 0.25).abs() < 1e-12);
        assert_eq!(x, 0.0);
    }

    #[test]
    fn all_zero_profile_has_no_normalization() {
        let profile = WeightProfile::new(0.0, 0.0, 0.0, 0.0).unwrap();
        assert!(profile.normalized().is_none());
    }

    #[test]
    fn profile_deserializes_with_validation() {
        let profile: WeightProfile = serde_json::from_str(r#"{"rating": 3, "random": 1}"#).unwrap();
        assert_eq!(profile.rating(), 3.0);
        assert_eq!(profile.play_count(), 0.0);

        let bad: std::result::Result<WeightProfile, _> = serde_json::from_str(r#"{"rating": -1}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn order_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let order = WeightedSampler::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).into_order(&mut rng);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_weights_trail_in_insertion_order() {
        let mut rng = StdRng::seed_from_u64(11);
        let order = WeightedSampler::new(&[0.0, 1.0, 0.0, 2.0, 0.0]).into_order(&mut rng);
        assert_eq!(&order[2..], &[0, 2, 4]);
    }

    #[test]
    fn single_positive_weight_always_first() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let order = WeightedSampler::new(&[0.0, 0.0, 5.0]).into_order(&mut rng);
            assert_eq!(order, vec![2, 0, 1]);
        }
    }

    #[test]
    fn first_draw_follows_weights() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut counts = [0u32; 3];
        for _ in 0..6000 {
            let mut sampler = WeightedSampler::new(&[1.0, 2.0, 3.0]);
            counts[sampler.draw(&mut rng).unwrap()] += 1;
        }
        // Expected 1000 / 2000 / 3000
        assert!((800..1200).contains(&counts[0]), "{:?}", counts);
        assert!((1750..2250).contains(&counts[1]), "{:?}", counts);
        assert!((2700..3300).contains(&counts[2]), "{:?}", counts);
    }

    #[test]
    fn draw_exhausts_positive_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler = WeightedSampler::new(&[1.0, 1.0]);
        assert!(sampler.draw(&mut rng).is_some());
        assert!(sampler.draw(&mut rng).is_some());
        assert!(sampler.draw(&mut rng).is_none());
        assert_eq!(sampler.total(), 0.0);
    }

    #[test]
    fn empty_sampler() {
        let mut rng = StdRng::seed_from_u64(0);
        let sampler = WeightedSampler::new(&[]);
        assert!(sampler.is_empty());
        assert!(sampler.into_order(&mut rng).is_empty());
    }
}
