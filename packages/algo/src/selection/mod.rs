//! Selection Engine
//!
//! Two entry points over a grade's catalog:
//!
//! - [`SelectionEngine::select_assessment`] - slot-based multi-strategy
//!   sampling for fixed-length assessments (precision, exam focus,
//!   challenge/discovery)
//! - [`SelectionEngine::select_next`] - single-item epsilon-greedy selection
//!   for continuous practice
//!
//! Randomness is always supplied by the caller so runs can be seeded.

pub mod adaptive;
pub mod assessment;
pub mod sampling;
pub mod srs;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::ability::AbilityModel;
use crate::config::{AlgoConfig, SelectionParams};
use crate::types::{AbilityState, Item, ItemProgress};

pub use sampling::WeightedPool;
pub use srs::srs_penalty;

/// Progress records keyed by item id
pub type ProgressMap = HashMap<String, ItemProgress>;

/// Learner snapshot the selectors read from
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub state: &'a AbilityState,
    pub progress: &'a ProgressMap,
    pub beginner_mode: bool,
    pub now: DateTime<Utc>,
}

impl<'a> SelectionContext<'a> {
    pub fn progress_of(&self, item: &Item) -> Option<&'a ItemProgress> {
        self.progress.get(&item.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    model: AbilityModel,
    params: SelectionParams,
}

impl SelectionEngine {
    pub fn new(model: AbilityModel, params: SelectionParams) -> Self {
        Self { model, params }
    }

    pub fn from_config(config: &AlgoConfig) -> Self {
        Self::new(
            AbilityModel::new(config.ability.clone()),
            config.selection.clone(),
        )
    }

    pub fn model(&self) -> &AbilityModel {
        &self.model
    }

    pub fn params(&self) -> &SelectionParams {
        &self.params
    }

    /// base + perAppearance × examFrequency
    pub fn exam_weight(&self, item: &Item) -> f64 {
        self.params.exam_weight_base
            + self.params.exam_weight_per_appearance * item.exam_frequency as f64
    }

    /// 1 + step × misses, capped; items never answered get no bonus.
    pub fn mistake_bonus(&self, progress: Option<&ItemProgress>) -> f64 {
        match progress {
            None => 1.0,
            Some(p) => (1.0 + self.params.mistake_bonus_step * p.incorrect_count as f64)
                .min(self.params.mistake_bonus_cap),
        }
    }

    pub fn srs_penalty(&self, progress: Option<&ItemProgress>, now: DateTime<Utc>) -> f64 {
        srs_penalty(
            &self.params.srs,
            progress.and_then(|p| p.last_answered_at),
            now,
        )
    }
}
