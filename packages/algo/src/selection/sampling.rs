//! Weighted sampling without replacement
//!
//! One primitive shared by every weighted slot group of the assessment
//! selector. Candidates keep their insertion order, which is what makes the
//! degenerate paths deterministic.

use rand::Rng;

use crate::sanitize::sanitize_weight;

#[derive(Debug, Clone)]
pub struct WeightedPool<T> {
    entries: Vec<(T, f64)>,
}

impl<T> Default for WeightedPool<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> WeightedPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool by weighing every candidate with `weight`.
    pub fn from_candidates<I, F>(candidates: I, mut weight: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> f64,
    {
        let entries = candidates
            .into_iter()
            .map(|candidate| {
                let w = sanitize_weight(weight(&candidate));
                (candidate, w)
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, candidate: T, weight: f64) {
        self.entries.push((candidate, sanitize_weight(weight)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| *w).sum()
    }

    /// Draws one candidate proportionally to its weight and removes it.
    pub fn take<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let total = self.total_weight();
        if total <= 0.0 {
            return Some(self.entries.remove(0).0);
        }
        let draw = rng.gen::<f64>() * total;
        self.take_with_draw(draw)
    }

    /// Walks the pool subtracting weights from `draw` and removes the first
    /// candidate at which the remainder reaches zero.
    ///
    /// A zero-or-less total takes the first candidate. If the walk runs out
    /// without triggering (floating-point rounding, or a draw at or above the
    /// total) the last candidate is taken.
    pub fn take_with_draw(&mut self, draw: f64) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        if self.total_weight() <= 0.0 {
            return Some(self.entries.remove(0).0);
        }

        let mut remaining = draw;
        for index in 0..self.entries.len() {
            remaining -= self.entries[index].1;
            if remaining <= 0.0 {
                return Some(self.entries.remove(index).0);
            }
        }

        self.entries.pop().map(|(candidate, _)| candidate)
    }

    /// Takes up to `count` candidates.
    pub fn take_many<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Vec<T> {
        let mut taken = Vec::with_capacity(count.min(self.entries.len()));
        while taken.len() < count {
            match self.take(rng) {
                Some(candidate) => taken.push(candidate),
                None => break,
            }
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_pool() {
        let mut pool: WeightedPool<&str> = WeightedPool::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(pool.take(&mut rng), None);
        assert_eq!(pool.take_with_draw(0.3), None);
    }

    #[test]
    fn test_zero_weights_return_input_order() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut pool = WeightedPool::from_candidates(["a", "b", "c"], |_| 0.0);
            assert_eq!(pool.take_many(3, &mut rng), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_invalid_weights_count_as_zero() {
        let mut pool = WeightedPool::new();
        pool.push("a", f64::NAN);
        pool.push("b", -2.0);
        assert_eq!(pool.total_weight(), 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(pool.take(&mut rng), Some("a"));
    }

    #[test]
    fn test_draw_walk_selects_bucket() {
        let mut pool = WeightedPool::from_candidates([("a", 1.0), ("b", 2.0), ("c", 3.0)], |c| c.1);
        assert_eq!(pool.take_with_draw(2.5).map(|c| c.0), Some("b"));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.take_with_draw(0.0).map(|c| c.0), Some("a"));
        assert_eq!(pool.take_with_draw(1.0).map(|c| c.0), Some("c"));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_walk_exhaustion_takes_last() {
        let mut pool = WeightedPool::from_candidates([("a", 0.1), ("b", 0.2), ("c", 0.0)], |c| c.1);
        // A draw at or beyond the total never triggers inside the walk.
        assert_eq!(pool.take_with_draw(0.3 + 1e-9).map(|c| c.0), Some("c"));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_zero_weight_items_skipped_when_others_positive() {
        let mut pool = WeightedPool::from_candidates([("z", 0.0), ("p", 1.0)], |c| c.1);
        assert_eq!(pool.take_with_draw(0.5).map(|c| c.0), Some("p"));
    }

    #[test]
    fn test_take_many_returns_each_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut pool = WeightedPool::from_candidates(0..50, |i| (*i % 7) as f64 + 0.5);
        let mut taken = pool.take_many(100, &mut rng);
        assert_eq!(taken.len(), 50);
        taken.sort();
        assert_eq!(taken, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_heavier_candidate_drawn_more_often() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut heavy_first = 0;
        for _ in 0..2000 {
            let mut pool = WeightedPool::from_candidates([("light", 1.0), ("heavy", 9.0)], |c| c.1);
            if pool.take(&mut rng).map(|c| c.0) == Some("heavy") {
                heavy_first += 1;
            }
        }
        assert!(heavy_first > 1600, "heavy drawn first {heavy_first} times");
    }
}
