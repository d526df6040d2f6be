//! Ability Model (1PL / Rasch)
//!
//! Logistic response model with a fixed discrimination parameter, Fisher
//! information, online theta/variance updates, per-category ability and the
//! aggregates built on top of them (pass probability, mastery, forgetting
//! risk).
//!
//! Every function is total: non-finite inputs are sanitized and outputs are
//! clamped, so callers never see NaN.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::{AbilityParams, CategoryWeights};
use crate::sanitize::{clamp_finite, clamp_probability, clamp_variance, finite_or};
use crate::types::{AbilityState, AnswerOutcome, Category, Item};

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Fractional hours between two instants, floored at zero.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    ((later - earlier).num_milliseconds() as f64 / MS_PER_HOUR).max(0.0)
}

#[derive(Debug, Clone, Default)]
pub struct AbilityModel {
    params: AbilityParams,
}

impl AbilityModel {
    pub fn new(params: AbilityParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AbilityParams {
        &self.params
    }

    // ==================== Response Model ====================

    /// P(correct) = 1 / (1 + exp(-a·(θ - b))), clamped to [0.001, 0.999].
    pub fn probability(&self, theta: f64, difficulty: f64) -> f64 {
        let theta = finite_or(theta, 0.0);
        let difficulty = finite_or(difficulty, 0.0);
        let z = self.params.discrimination * (theta - difficulty);
        clamp_probability(1.0 / (1.0 + (-z).exp()))
    }

    /// I(θ) = a²·p·(1-p); peaks where θ equals the difficulty.
    pub fn fisher_information(&self, theta: f64, difficulty: f64) -> f64 {
        let p = self.probability(theta, difficulty);
        let a = self.params.discrimination;
        a * a * p * (1.0 - p)
    }

    /// Theta change an answer would cause, without touching any state.
    pub fn delta_theta(
        &self,
        theta: f64,
        difficulty: f64,
        is_correct: bool,
        beginner_mode: bool,
    ) -> f64 {
        let p = self.probability(theta, difficulty);
        if is_correct {
            self.params.learning_rate * (1.0 - p)
        } else {
            let rate = if beginner_mode {
                self.params.beginner_incorrect_rate
            } else {
                self.params.learning_rate
            };
            -rate * p
        }
    }

    pub fn update_theta(
        &self,
        theta: f64,
        difficulty: f64,
        is_correct: bool,
        beginner_mode: bool,
    ) -> f64 {
        finite_or(theta, 0.0) + self.delta_theta(theta, difficulty, is_correct, beginner_mode)
    }

    /// Posterior variance after observing one response: 1 / (1/σ² + I(θ)).
    pub fn update_variance(&self, variance: f64, theta: f64, difficulty: f64) -> f64 {
        let variance = clamp_variance(variance);
        let info = self.fisher_information(theta, difficulty);
        clamp_variance(1.0 / (1.0 / variance + info))
    }

    // ==================== Category Theta ====================

    /// Theta used for items of `category`; `Other` reads the global theta.
    pub fn category_theta(state: &AbilityState, category: Category) -> f64 {
        match category {
            Category::Noun => state.noun_theta,
            Category::Verb => state.verb_theta,
            Category::Adjective => state.adjective_theta,
            Category::Phrase => state.phrase_theta,
            Category::Other => state.theta,
        }
    }

    /// Writes the dedicated theta of `category`; `Other` has none and is left alone.
    pub fn set_category_theta(state: &mut AbilityState, category: Category, value: f64) {
        match category {
            Category::Noun => state.noun_theta = value,
            Category::Verb => state.verb_theta = value,
            Category::Adjective => state.adjective_theta = value,
            Category::Phrase => state.phrase_theta = value,
            Category::Other => {}
        }
    }

    /// Modeled probability of answering `item` correctly right now.
    pub fn item_probability(&self, state: &AbilityState, item: &Item) -> f64 {
        self.probability(Self::category_theta(state, item.category), item.difficulty)
    }

    // ==================== Answer Processing ====================

    /// Applies one scored answer in place and returns the global theta delta.
    ///
    /// Order matters: the category theta is updated from its pre-answer value
    /// and the variance from the post-answer global theta.
    pub fn process_answer(
        &self,
        state: &mut AbilityState,
        item: &Item,
        is_correct: bool,
        beginner_mode: bool,
    ) -> f64 {
        let old_theta = finite_or(state.theta, 0.0);
        let old_category_theta = Self::category_theta(state, item.category);

        state.theta = self.update_theta(old_theta, item.difficulty, is_correct, beginner_mode);

        let new_category_theta = self.update_theta(
            old_category_theta,
            item.difficulty,
            is_correct,
            beginner_mode,
        );
        Self::set_category_theta(state, item.category, new_category_theta);

        state.variance = self.update_variance(state.variance, state.theta, item.difficulty);
        state.total_answered = state.total_answered.saturating_add(1);

        state.theta - old_theta
    }

    /// Pure counterpart of [`process_answer`](Self::process_answer): returns
    /// the next state and leaves `state` untouched.
    pub fn next_state(
        &self,
        state: &AbilityState,
        item: &Item,
        is_correct: bool,
        beginner_mode: bool,
        now: DateTime<Utc>,
    ) -> AnswerOutcome {
        let mut next = state.clone();
        let delta_theta = self.process_answer(&mut next, item, is_correct, beginner_mode);
        next.updated_at = now;
        AnswerOutcome {
            state: next,
            delta_theta,
        }
    }

    // ==================== Aggregates ====================

    /// Weighted mean over categories of the per-category mean probability.
    ///
    /// Only categories present in `items` that carry a weight take part, and
    /// the weights are renormalized over those. Empty input yields 0.0.
    pub fn pass_probability(
        &self,
        state: &AbilityState,
        items: &[Item],
        weights: &CategoryWeights,
    ) -> f64 {
        let mut sums = [0.0f64; 4];
        let mut counts = [0usize; 4];

        for item in items {
            let Some(slot) = Category::TRACKED.iter().position(|c| *c == item.category) else {
                continue;
            };
            sums[slot] += self.item_probability(state, item);
            counts[slot] += 1;
        }

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (slot, category) in Category::TRACKED.iter().enumerate() {
            if counts[slot] == 0 {
                continue;
            }
            let Some(weight) = weights.weight(*category) else {
                continue;
            };
            let weight = finite_or(weight, 0.0).max(0.0);
            weighted += weight * sums[slot] / counts[slot] as f64;
            total_weight += weight;
        }

        if total_weight <= 0.0 {
            return 0.0;
        }
        clamp_finite(weighted / total_weight, 0.0, 1.0)
    }

    /// Items that were answered at least once and are modeled above the
    /// mastery threshold.
    pub fn count_mastered(
        &self,
        state: &AbilityState,
        items: &[Item],
        answered_ids: &HashSet<String>,
    ) -> usize {
        items
            .iter()
            .filter(|item| answered_ids.contains(&item.id))
            .filter(|item| self.item_probability(state, item) > self.params.mastery_threshold)
            .count()
    }

    pub fn is_beginner(&self, mastered_count: usize) -> bool {
        mastered_count < self.params.beginner_mastery_threshold
    }

    /// 1 - exp(-λ·days since last answer); never answered is maximal risk.
    pub fn forget_risk(&self, last_answered_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(last) = last_answered_at else {
            return 1.0;
        };
        let elapsed_days = ((now - last).num_milliseconds() as f64 / MS_PER_DAY).max(0.0);
        let retention = (-self.params.forget_lambda * elapsed_days).exp();
        clamp_finite(1.0 - retention, 0.0, 1.0)
    }

    // ==================== Session Decay ====================

    /// Penalty owed for a gap of `hours_since_last` between sessions: the
    /// two-day penalty from 48h, the one-day penalty from 24h, else none.
    pub fn session_decay(&self, hours_since_last: f64) -> f64 {
        if hours_since_last >= 48.0 {
            self.params.decay_two_day_penalty
        } else if hours_since_last >= 24.0 {
            self.params.decay_day_penalty
        } else {
            0.0
        }
    }

    /// Lowers every theta field by the decay penalty; returns the amount applied.
    pub fn apply_session_decay(&self, state: &mut AbilityState, hours_since_last: f64) -> f64 {
        let penalty = self.session_decay(hours_since_last);
        if penalty > 0.0 {
            for theta in state.thetas_mut() {
                *theta -= penalty;
            }
        }
        penalty
    }
}
