//! Adaptive single-item selection for continuous practice
//!
//! Epsilon-greedy over `examWeight × (1 - accuracy) × forgetRisk`, skipping
//! recently shown items whenever anything else is left.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{ProgressMap, SelectionEngine};
use crate::types::{Item, ItemProgress};

impl SelectionEngine {
    /// Greedy priority of an item for practice.
    pub fn practice_priority(
        &self,
        item: &Item,
        progress: Option<&ItemProgress>,
        now: DateTime<Utc>,
    ) -> f64 {
        let accuracy = progress.map_or(0.0, ItemProgress::accuracy);
        let last_answered_at = progress.and_then(|p| p.last_answered_at);
        let risk = self.model.forget_risk(last_answered_at, now);
        self.exam_weight(item) * (1.0 - accuracy) * risk
    }

    /// Picks the next practice item; `None` only for an empty candidate set.
    ///
    /// If every candidate was shown recently the pick is uniform over all of
    /// them. Ties on priority go to the first candidate in input order.
    pub fn select_next<'a, R: Rng + ?Sized>(
        &self,
        candidates: &'a [Item],
        recent: &HashSet<String>,
        progress: &ProgressMap,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<&'a Item> {
        if candidates.is_empty() {
            return None;
        }

        let fresh: Vec<&'a Item> = candidates
            .iter()
            .filter(|item| !recent.contains(&item.id))
            .collect();

        if fresh.is_empty() {
            return candidates.choose(rng);
        }

        if rng.gen::<f64>() < self.params.exploration_epsilon {
            return fresh.choose(rng).copied();
        }

        let mut best: Option<(&'a Item, f64)> = None;
        for item in fresh {
            let priority = self.practice_priority(item, progress.get(&item.id), now);
            match best {
                Some((_, top)) if priority <= top => {}
                _ => best = Some((item, priority)),
            }
        }
        best.map(|(item, _)| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityModel;
    use crate::config::SelectionParams;
    use crate::types::Category;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(id: &str, exam_frequency: u32) -> Item {
        Item {
            id: id.to_string(),
            grade: 1,
            word: id.to_string(),
            meaning: id.to_string(),
            phrase: None,
            phrase_meaning: None,
            category: Category::Verb,
            difficulty: 0.0,
            exam_frequency,
        }
    }

    fn with_epsilon(exploration_epsilon: f64) -> SelectionEngine {
        SelectionEngine::new(
            AbilityModel::default(),
            SelectionParams {
                exploration_epsilon,
                ..Default::default()
            },
        )
    }

    fn greedy() -> SelectionEngine {
        with_epsilon(0.0)
    }

    fn pick<'a>(
        engine: &SelectionEngine,
        items: &'a [Item],
        recent: &HashSet<String>,
        rng: &mut ChaCha8Rng,
    ) -> &'a Item {
        engine
            .select_next(items, recent, &ProgressMap::new(), Utc::now(), rng)
            .unwrap()
    }

    #[test]
    fn test_empty_candidates() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let engine = SelectionEngine::default();
        let recent = HashSet::new();
        let progress = ProgressMap::new();
        let now = Utc::now();
        let picked = engine.select_next(&[], &recent, &progress, now, &mut rng);
        assert!(picked.is_none());
    }

    #[test]
    fn test_priority_formula() {
        let engine = SelectionEngine::default();
        let now = Utc::now();
        let word = item("w", 10);
        let unseen = engine.practice_priority(&word, None, now);
        assert!((unseen - 2.0).abs() < 1e-12);

        let mut progress = ItemProgress::new("w");
        progress.correct_count = 3;
        progress.incorrect_count = 1;
        progress.last_answered_at = Some(now - Duration::days(7));
        let expected = 2.0 * 0.25 * (1.0 - (-0.7f64).exp());
        let priority = engine.practice_priority(&word, Some(&progress), now);
        assert!((priority - expected).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_picks_highest_priority() {
        let engine = greedy();
        let items = vec![item("low", 0), item("high", 20), item("mid", 5)];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let picked = pick(&engine, &items, &HashSet::new(), &mut rng);
        assert_eq!(picked.id, "high");
    }

    #[test]
    fn test_ties_resolve_to_first() {
        let engine = greedy();
        let items = vec![item("first", 3), item("second", 3), item("third", 3)];
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = pick(&engine, &items, &HashSet::new(), &mut rng);
            assert_eq!(picked.id, "first");
        }
    }

    #[test]
    fn test_recent_items_are_skipped() {
        let engine = greedy();
        let items = vec![item("hot", 50), item("cold", 0)];
        let recent: HashSet<String> = ["hot".to_string()].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let picked = pick(&engine, &items, &recent, &mut rng);
        assert_eq!(picked.id, "cold");
    }

    #[test]
    fn test_all_recent_falls_back_to_full_set() {
        let engine = greedy();
        let items = vec![item("a", 1), item("b", 1)];
        let recent: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let mut seen = HashSet::new();
        for seed in 0..40 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = pick(&engine, &items, &recent, &mut rng);
            seen.insert(picked.id.clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_exploration_reaches_low_priority_items() {
        let engine = with_epsilon(1.0);
        let items = vec![item("top", 100), item("bottom", 0)];
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut bottom = 0;
        for _ in 0..200 {
            if pick(&engine, &items, &HashSet::new(), &mut rng).id == "bottom" {
                bottom += 1;
            }
        }
        assert!(bottom > 50);
    }

    #[test]
    fn test_exploration_skips_recent_items() {
        let engine = with_epsilon(1.0);
        let items = vec![item("a", 9), item("b", 9), item("c", 0), item("d", 0)];
        let recent: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let picked = pick(&engine, &items, &recent, &mut rng);
            assert!(!recent.contains(&picked.id), "explored into {}", picked.id);
            seen.insert(picked.id.clone());
        }
        assert_eq!(seen.len(), 2);
    }
}
