//! Assessment selection
//!
//! Splits `count` slots into three groups drawn from the SRS-eligible pool:
//!
//! 1. precision (~60%) - weighted by Fisher information at the category
//!    theta, exam weight, SRS penalty and mistake bonus
//! 2. exam focus (~20%) - unmastered items weighted by exam frequency
//! 3. challenge / discovery (rest) - uniform over hard items (advanced) or
//!    never-seen items (beginner), topped up from whatever is left

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{SelectionContext, SelectionEngine, WeightedPool};
use crate::ability::AbilityModel;
use crate::types::Item;

/// Slot counts for one assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPlan {
    pub precision: usize,
    pub exam: usize,
    pub challenge: usize,
}

impl SlotPlan {
    pub fn total(&self) -> usize {
        self.precision + self.exam + self.challenge
    }
}

impl SelectionEngine {
    /// Slot split for `count` questions: each weighted group gets at least
    /// one slot while the total never exceeds `count`.
    pub fn slot_plan(&self, count: usize) -> SlotPlan {
        if count == 0 {
            return SlotPlan {
                precision: 0,
                exam: 0,
                challenge: 0,
            };
        }
        let share = |fraction: f64| ((count as f64) * fraction).floor() as usize;
        let precision = share(self.params.precision_share).max(1).min(count);
        let exam = share(self.params.exam_share).max(1).min(count - precision);
        SlotPlan {
            precision,
            exam,
            challenge: count - precision - exam,
        }
    }

    /// Items that pass SRS gating and, in beginner mode, the difficulty cap.
    pub fn eligible<'a>(&self, items: &'a [Item], ctx: &SelectionContext<'_>) -> Vec<&'a Item> {
        let cap = ctx.state.theta + self.params.beginner_difficulty_cap;
        items
            .iter()
            .filter(|item| self.is_due(item, ctx))
            .filter(|item| !ctx.beginner_mode || item.difficulty <= cap)
            .collect()
    }

    fn is_due(&self, item: &Item, ctx: &SelectionContext<'_>) -> bool {
        self.srs_penalty(ctx.progress_of(item), ctx.now) > 0.0
    }

    /// Weight used by the precision slots.
    pub fn precision_weight(&self, item: &Item, ctx: &SelectionContext<'_>) -> f64 {
        let progress = ctx.progress_of(item);
        let theta = AbilityModel::category_theta(ctx.state, item.category);
        self.model.fisher_information(theta, item.difficulty)
            * self.exam_weight(item)
            * self.srs_penalty(progress, ctx.now)
            * self.mistake_bonus(progress)
    }

    /// Weight used by the exam-focus slots.
    pub fn exam_focus_weight(&self, item: &Item, ctx: &SelectionContext<'_>) -> f64 {
        item.exam_frequency as f64 * self.srs_penalty(ctx.progress_of(item), ctx.now)
    }

    /// Picks up to `count` distinct items for one assessment, in random order.
    ///
    /// An undersized eligible pool yields fewer items; an empty catalog yields
    /// none.
    pub fn select_assessment<'a, R: Rng + ?Sized>(
        &self,
        items: &'a [Item],
        ctx: &SelectionContext<'_>,
        count: usize,
        rng: &mut R,
    ) -> Vec<&'a Item> {
        let plan = self.slot_plan(count);
        let eligible = self.eligible(items, ctx);

        let mut chosen: HashSet<&str> = HashSet::new();
        let mut selection: Vec<&'a Item> = Vec::with_capacity(count);

        let mut precision_pool = WeightedPool::from_candidates(eligible.iter().copied(), |item| {
            self.precision_weight(item, ctx)
        });
        let precision = precision_pool.take_many(plan.precision, rng);
        let precision_taken = push_unique(&mut selection, &mut chosen, precision);

        let exam_candidates: Vec<&'a Item> = eligible
            .iter()
            .copied()
            .filter(|item| {
                !chosen.contains(item.id.as_str())
                    && !ctx.progress_of(item).is_some_and(|p| p.is_learned)
                    && self.exam_focus_weight(item, ctx) > 0.0
            })
            .collect();
        let mut exam_pool = WeightedPool::from_candidates(exam_candidates, |item| {
            self.exam_focus_weight(item, ctx)
        });
        let exam = exam_pool.take_many(plan.exam, rng);
        let exam_taken = push_unique(&mut selection, &mut chosen, exam);

        let challenge = self.challenge_draw(&eligible, &chosen, ctx, plan.challenge, rng);
        let challenge_taken = push_unique(&mut selection, &mut chosen, challenge);

        selection.shuffle(rng);

        tracing::debug!(
            requested = count,
            eligible = eligible.len(),
            precision = precision_taken,
            exam = exam_taken,
            challenge = challenge_taken,
            beginner = ctx.beginner_mode,
            "assessment selection"
        );

        selection
    }

    /// Uniform draw from the targeted pool, with any shortfall filled from the
    /// remaining eligible items.
    fn challenge_draw<'a, R: Rng + ?Sized>(
        &self,
        eligible: &[&'a Item],
        chosen: &HashSet<&str>,
        ctx: &SelectionContext<'_>,
        slots: usize,
        rng: &mut R,
    ) -> Vec<&'a Item> {
        if slots == 0 {
            return Vec::new();
        }
        let remaining: Vec<&'a Item> = eligible
            .iter()
            .copied()
            .filter(|item| !chosen.contains(item.id.as_str()))
            .collect();

        let threshold = ctx.state.theta + self.params.challenge_margin;
        let mut targeted: Vec<&'a Item> = remaining
            .iter()
            .copied()
            .filter(|item| {
                if ctx.beginner_mode {
                    ctx.progress_of(item).is_none_or(|p| p.attempts() == 0)
                } else {
                    item.difficulty >= threshold
                }
            })
            .collect();
        targeted.shuffle(rng);
        targeted.truncate(slots);

        if targeted.len() < slots {
            let taken: HashSet<&str> = targeted.iter().map(|item| item.id.as_str()).collect();
            let mut filler: Vec<&'a Item> = remaining
                .into_iter()
                .filter(|item| !taken.contains(item.id.as_str()))
                .collect();
            filler.shuffle(rng);
            filler.truncate(slots - targeted.len());
            targeted.extend(filler);
        }

        targeted
    }
}

fn push_unique<'a>(
    selection: &mut Vec<&'a Item>,
    chosen: &mut HashSet<&'a str>,
    drawn: Vec<&'a Item>,
) -> usize {
    let before = selection.len();
    for item in drawn {
        if chosen.insert(item.id.as_str()) {
            selection.push(item);
        }
    }
    selection.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ProgressMap;
    use crate::types::{AbilityState, Category, ItemProgress};
    use chrono::{Duration, Utc};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(id: &str, difficulty: f64, exam_frequency: u32) -> Item {
        Item {
            id: id.to_string(),
            grade: 1,
            word: id.to_string(),
            meaning: format!("meaning {id}"),
            phrase: None,
            phrase_meaning: None,
            category: Category::Noun,
            difficulty,
            exam_frequency,
        }
    }

    fn catalog(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| {
                let difficulty = (i as f64 / n as f64) * 4.0 - 2.0;
                item(&format!("w{i:03}"), difficulty, (i % 4) as u32)
            })
            .collect()
    }

    fn plan(precision: usize, exam: usize, challenge: usize) -> SlotPlan {
        SlotPlan {
            precision,
            exam,
            challenge,
        }
    }

    fn answered(id: &str, hours_ago: i64, incorrect: u32) -> ItemProgress {
        let mut progress = ItemProgress::new(id);
        progress.incorrect_count = incorrect;
        progress.correct_count = 1;
        progress.last_answered_at = Some(Utc::now() - Duration::hours(hours_ago));
        progress
    }

    fn ctx<'a>(
        state: &'a AbilityState,
        progress: &'a ProgressMap,
        beginner_mode: bool,
    ) -> SelectionContext<'a> {
        SelectionContext {
            state,
            progress,
            beginner_mode,
            now: Utc::now(),
        }
    }

    fn ids(items: &[&Item]) -> Vec<String> {
        let mut ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_slot_plan() {
        let engine = SelectionEngine::default();
        assert_eq!(engine.slot_plan(10), plan(6, 2, 2));
        assert_eq!(engine.slot_plan(1), plan(1, 0, 0));
        assert_eq!(engine.slot_plan(2), plan(1, 1, 0));
        assert_eq!(engine.slot_plan(4), plan(2, 1, 1));
        assert_eq!(engine.slot_plan(0).total(), 0);
        for count in 0..40 {
            assert_eq!(engine.slot_plan(count).total(), count);
        }
    }

    #[test]
    fn test_small_pool_returns_all_distinct() {
        let engine = SelectionEngine::default();
        let items = catalog(5);
        let state = AbilityState::new(1, Utc::now());
        let progress = ProgressMap::new();
        let c = ctx(&state, &progress, false);
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = engine.select_assessment(&items, &c, 10, &mut rng);
            assert_eq!(picked.len(), 5);
            assert_eq!(ids(&picked), vec!["w000", "w001", "w002", "w003", "w004"]);
        }
    }

    #[test]
    fn test_full_pool_fills_count_without_duplicates() {
        let engine = SelectionEngine::default();
        let items = catalog(60);
        let state = AbilityState::new(1, Utc::now());
        let progress = ProgressMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let c = ctx(&state, &progress, false);
        let picked = engine.select_assessment(&items, &c, 10, &mut rng);
        assert_eq!(picked.len(), 10);
        let unique: HashSet<&str> = picked.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_empty_catalog() {
        let engine = SelectionEngine::default();
        let state = AbilityState::new(1, Utc::now());
        let progress = ProgressMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let c = ctx(&state, &progress, false);
        assert!(engine.select_assessment(&[], &c, 10, &mut rng).is_empty());
    }

    #[test]
    fn test_recently_answered_items_are_blocked() {
        let engine = SelectionEngine::default();
        let items = catalog(6);
        let state = AbilityState::new(1, Utc::now());
        let mut progress = ProgressMap::new();
        progress.insert("w000".into(), answered("w000", 2, 0));
        progress.insert("w001".into(), answered("w001", 23, 0));
        progress.insert("w002".into(), answered("w002", 30, 0));

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let c = ctx(&state, &progress, false);
        let picked = engine.select_assessment(&items, &c, 10, &mut rng);
        let picked = ids(&picked);
        assert!(!picked.contains(&"w000".to_string()));
        assert!(!picked.contains(&"w001".to_string()));
        assert!(picked.contains(&"w002".to_string()));
        assert_eq!(picked.len(), 4);
    }

    #[test]
    fn test_beginner_difficulty_cap() {
        let engine = SelectionEngine::default();
        let items = vec![
            item("easy", -1.0, 0),
            item("edge", 0.5, 0),
            item("hard", 0.51, 0),
        ];
        let state = AbilityState::new(1, Utc::now());
        let progress = ProgressMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let c = ctx(&state, &progress, true);
        let beginner = engine.select_assessment(&items, &c, 10, &mut rng);
        assert_eq!(ids(&beginner), vec!["easy", "edge"]);

        let c = ctx(&state, &progress, false);
        let advanced = engine.select_assessment(&items, &c, 10, &mut rng);
        assert_eq!(advanced.len(), 3);
    }

    #[test]
    fn test_precision_weight_components() {
        let engine = SelectionEngine::default();
        let state = AbilityState::new(1, Utc::now());
        let mut progress = ProgressMap::new();
        progress.insert("w".into(), answered("w", 50, 2));
        let word = item("w", 0.0, 10);
        let c = ctx(&state, &progress, false);
        // fisher 0.25 × exam 2.0 × srs 0.3 × bonus 1.6
        let expected = 0.25 * 2.0 * 0.3 * 1.6;
        assert!((engine.precision_weight(&word, &c) - expected).abs() < 1e-9);
        assert!((engine.exam_focus_weight(&word, &c) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_exam_focus_skips_learned_items() {
        // Zero exam weights make the precision slot deterministic: it takes
        // the first eligible item.
        let engine = SelectionEngine::new(
            AbilityModel::default(),
            crate::config::SelectionParams {
                exam_weight_base: 0.0,
                exam_weight_per_appearance: 0.0,
                ..Default::default()
            },
        );
        let items = vec![
            item("anchor", 0.0, 0),
            item("learned", 0.0, 9),
            item("fresh", 0.0, 5),
        ];
        let state = AbilityState::new(1, Utc::now());
        let mut progress = ProgressMap::new();
        let mut learned = answered("learned", 400, 0);
        learned.is_learned = true;
        learned.consecutive_correct = 3;
        progress.insert("learned".into(), learned);
        let c = ctx(&state, &progress, false);

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = engine.select_assessment(&items, &c, 2, &mut rng);
            assert_eq!(ids(&picked), vec!["anchor", "fresh"]);
        }
    }

    #[test]
    fn test_beginner_discovery_prefers_unseen() {
        let engine = SelectionEngine::new(
            AbilityModel::default(),
            crate::config::SelectionParams {
                precision_share: 0.0,
                exam_share: 0.0,
                ..Default::default()
            },
        );
        // count 3 -> 1 precision, 1 exam, 1 discovery slot
        let items = vec![
            item("seen-a", 0.0, 0),
            item("seen-b", 0.0, 0),
            item("seen-c", 0.0, 0),
            item("unseen", 0.0, 0),
        ];
        let state = AbilityState::new(1, Utc::now());
        let mut progress = ProgressMap::new();
        for id in ["seen-a", "seen-b", "seen-c"] {
            progress.insert(id.into(), answered(id, 400, 0));
        }
        // Zero exam frequency leaves the exam slot empty; the precision pool
        // is uniform so "unseen" may go there, otherwise discovery must take it.
        let c = ctx(&state, &progress, true);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = engine.select_assessment(&items, &c, 3, &mut rng);
            assert_eq!(picked.len(), 2);
            assert!(picked.iter().any(|i| i.id == "unseen"));
        }
    }

    #[test]
    fn test_advanced_challenge_fills_shortfall() {
        let engine = SelectionEngine::default();
        let items = catalog(12);
        let mut state = AbilityState::new(1, Utc::now());
        state.theta = 10.0; // nothing qualifies as a challenge
        state.noun_theta = 10.0;
        let progress = ProgressMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let c = ctx(&state, &progress, false);
        let picked = engine.select_assessment(&items, &c, 10, &mut rng);
        assert_eq!(picked.len(), 10);
    }

    #[test]
    fn test_duplicate_catalog_ids_are_collapsed() {
        let engine = SelectionEngine::default();
        let items = vec![
            item("dup", 0.0, 1),
            item("dup", 0.0, 1),
            item("solo", 0.0, 1),
        ];
        let state = AbilityState::new(1, Utc::now());
        let progress = ProgressMap::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let c = ctx(&state, &progress, false);
        let picked = engine.select_assessment(&items, &c, 10, &mut rng);
        assert_eq!(ids(&picked), vec!["dup", "solo"]);
    }
}
