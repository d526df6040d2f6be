//! Configuration table
//!
//! Every tunable constant of the ability model and the selection engine.
//! `AlgoConfig::default()` is the built-in table; a JSON document may
//! override any subset of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Category;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Weight of each tracked category in the pass-probability aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub noun: f64,
    pub verb: f64,
    pub adjective: f64,
    pub phrase: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            noun: 0.35,
            verb: 0.30,
            adjective: 0.20,
            phrase: 0.15,
        }
    }
}

impl CategoryWeights {
    /// Weight for a category; `Other` carries none.
    pub fn weight(&self, category: Category) -> Option<f64> {
        match category {
            Category::Noun => Some(self.noun),
            Category::Verb => Some(self.verb),
            Category::Adjective => Some(self.adjective),
            Category::Phrase => Some(self.phrase),
            Category::Other => None,
        }
    }

    /// Table with a single non-zero weight.
    pub fn only(category: Category) -> Self {
        let mut weights = Self {
            noun: 0.0,
            verb: 0.0,
            adjective: 0.0,
            phrase: 0.0,
        };
        match category {
            Category::Noun => weights.noun = 1.0,
            Category::Verb => weights.verb = 1.0,
            Category::Adjective => weights.adjective = 1.0,
            Category::Phrase => weights.phrase = 1.0,
            Category::Other => {}
        }
        weights
    }
}

/// Ability model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityParams {
    pub discrimination: f64,
    pub learning_rate: f64,
    pub beginner_incorrect_rate: f64,
    /// Forgetting rate per day
    pub forget_lambda: f64,
    pub mastery_threshold: f64,
    /// Learners with fewer mastered items than this are in beginner mode
    pub beginner_mastery_threshold: usize,
    pub decay_day_penalty: f64,
    pub decay_two_day_penalty: f64,
}

impl Default for AbilityParams {
    fn default() -> Self {
        Self {
            discrimination: 1.0,
            learning_rate: 0.3,
            beginner_incorrect_rate: 0.15,
            forget_lambda: 0.1,
            mastery_threshold: 0.8,
            beginner_mastery_threshold: 30,
            decay_day_penalty: 0.01,
            decay_two_day_penalty: 0.05,
        }
    }
}

/// Selection engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    pub assessment_size: usize,
    pub precision_share: f64,
    pub exam_share: f64,
    pub beginner_difficulty_cap: f64,
    pub challenge_margin: f64,
    pub exam_weight_base: f64,
    pub exam_weight_per_appearance: f64,
    pub mistake_bonus_step: f64,
    pub mistake_bonus_cap: f64,
    pub exploration_epsilon: f64,
    pub srs: SrsWindows,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            assessment_size: 10,
            precision_share: 0.6,
            exam_share: 0.2,
            beginner_difficulty_cap: 0.5,
            challenge_margin: 0.3,
            exam_weight_base: 1.0,
            exam_weight_per_appearance: 0.1,
            mistake_bonus_step: 0.3,
            mistake_bonus_cap: 3.0,
            exploration_epsilon: 0.1,
            srs: SrsWindows::default(),
        }
    }
}

/// Spaced-repetition gating windows (hours) and their penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrsWindows {
    pub block_hours: f64,
    pub short_hours: f64,
    pub short_penalty: f64,
    pub medium_hours: f64,
    pub medium_penalty: f64,
}

impl Default for SrsWindows {
    fn default() -> Self {
        Self {
            block_hours: 24.0,
            short_hours: 72.0,
            short_penalty: 0.3,
            medium_hours: 168.0,
            medium_penalty: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgoConfig {
    pub ability: AbilityParams,
    pub selection: SelectionParams,
    pub category_weights: CategoryWeights,
}

impl AlgoConfig {
    /// Parses a possibly partial JSON document over the defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AlgoConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.ability;
        let s = &self.selection;
        let w = &self.category_weights;

        positive("ability.discrimination", a.discrimination)?;
        non_negative("ability.learning_rate", a.learning_rate)?;
        non_negative("ability.beginner_incorrect_rate", a.beginner_incorrect_rate)?;
        non_negative("ability.forget_lambda", a.forget_lambda)?;
        unit_interval("ability.mastery_threshold", a.mastery_threshold)?;
        non_negative("ability.decay_day_penalty", a.decay_day_penalty)?;
        non_negative("ability.decay_two_day_penalty", a.decay_two_day_penalty)?;

        unit_interval("selection.precision_share", s.precision_share)?;
        unit_interval("selection.exam_share", s.exam_share)?;
        if s.precision_share + s.exam_share > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "selection.precision_share + selection.exam_share",
                value: s.precision_share + s.exam_share,
            });
        }
        finite(
            "selection.beginner_difficulty_cap",
            s.beginner_difficulty_cap,
        )?;
        finite("selection.challenge_margin", s.challenge_margin)?;
        non_negative("selection.exam_weight_base", s.exam_weight_base)?;
        non_negative(
            "selection.exam_weight_per_appearance",
            s.exam_weight_per_appearance,
        )?;
        non_negative("selection.mistake_bonus_step", s.mistake_bonus_step)?;
        if s.mistake_bonus_cap < 1.0 || !s.mistake_bonus_cap.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "selection.mistake_bonus_cap",
                value: s.mistake_bonus_cap,
            });
        }
        unit_interval("selection.exploration_epsilon", s.exploration_epsilon)?;
        unit_interval("selection.srs.short_penalty", s.srs.short_penalty)?;
        unit_interval("selection.srs.medium_penalty", s.srs.medium_penalty)?;
        if !(s.srs.block_hours <= s.srs.short_hours && s.srs.short_hours <= s.srs.medium_hours) {
            return Err(ConfigError::OutOfRange {
                field: "selection.srs windows",
                value: s.srs.short_hours,
            });
        }

        non_negative("category_weights.noun", w.noun)?;
        non_negative("category_weights.verb", w.verb)?;
        non_negative("category_weights.adjective", w.adjective)?;
        non_negative("category_weights.phrase", w.phrase)?;

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    non_negative(field, value)?;
    if value == 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    non_negative(field, value)?;
    if value > 1.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}
