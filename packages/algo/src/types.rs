//! Common Types and Constants
//!
//! Shared data structures used by the ability model, the selection engine and
//! the session layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lower bound for every modeled probability
pub const MIN_PROBABILITY: f64 = 0.001;

/// Upper bound for every modeled probability
pub const MAX_PROBABILITY: f64 = 0.999;

/// Lower bound for the ability variance
pub const MIN_VARIANCE: f64 = 0.01;

/// Upper bound for the ability variance
pub const MAX_VARIANCE: f64 = 10.0;

/// Variance assigned to a fresh ability state
pub const INITIAL_VARIANCE: f64 = 1.0;

/// Consecutive correct answers needed before an item counts as learned
pub const LEARNED_STREAK: u32 = 3;

// ==================== Catalog Types ====================

/// Word category. The four named categories each carry a dedicated theta;
/// any other label in a catalog deserializes to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Noun,
    Verb,
    Adjective,
    Phrase,
    #[serde(other)]
    Other,
}

impl Category {
    /// Categories with a dedicated theta field, in weight-table order.
    pub const TRACKED: [Category; 4] = [
        Category::Noun,
        Category::Verb,
        Category::Adjective,
        Category::Phrase,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Noun => "noun",
            Category::Verb => "verb",
            Category::Adjective => "adjective",
            Category::Phrase => "phrase",
            Category::Other => "other",
        }
    }
}

/// Immutable catalog entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id
    pub id: String,
    /// Grade the item belongs to
    #[serde(default)]
    pub grade: u32,
    /// Headword
    pub word: String,
    /// Base meaning shown as an answer option
    pub meaning: String,
    /// Optional phrase using the headword
    #[serde(default)]
    pub phrase: Option<String>,
    /// Meaning of `phrase`
    #[serde(default)]
    pub phrase_meaning: Option<String>,
    pub category: Category,
    /// Difficulty on the theta scale
    pub difficulty: f64,
    /// Number of appearances in past exams
    #[serde(default)]
    pub exam_frequency: u32,
}

// ==================== Learner State ====================

/// Ability estimate for one learner-grade
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    pub grade: u32,
    /// Global theta
    pub theta: f64,
    pub noun_theta: f64,
    pub verb_theta: f64,
    pub adjective_theta: f64,
    pub phrase_theta: f64,
    /// Estimate variance, kept in [MIN_VARIANCE, MAX_VARIANCE]
    pub variance: f64,
    pub total_answered: u64,
    pub session_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl AbilityState {
    pub fn new(grade: u32, now: DateTime<Utc>) -> Self {
        Self {
            grade,
            theta: 0.0,
            noun_theta: 0.0,
            verb_theta: 0.0,
            adjective_theta: 0.0,
            phrase_theta: 0.0,
            variance: INITIAL_VARIANCE,
            total_answered: 0,
            session_count: 0,
            updated_at: now,
        }
    }

    /// Mutable references to every theta field, global first.
    pub fn thetas_mut(&mut self) -> [&mut f64; 5] {
        [
            &mut self.theta,
            &mut self.noun_theta,
            &mut self.verb_theta,
            &mut self.adjective_theta,
            &mut self.phrase_theta,
        ]
    }
}

/// Per-item answer history for one learner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub item_id: String,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub consecutive_correct: u32,
    pub is_learned: bool,
    /// `None` means never answered
    pub last_answered_at: Option<DateTime<Utc>>,
}

impl ItemProgress {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            correct_count: 0,
            incorrect_count: 0,
            consecutive_correct: 0,
            is_learned: false,
            last_answered_at: None,
        }
    }

    /// Applies one scored answer.
    pub fn record_answer(&mut self, is_correct: bool, at: DateTime<Utc>) {
        if is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
            self.consecutive_correct = self.consecutive_correct.saturating_add(1);
        } else {
            self.incorrect_count = self.incorrect_count.saturating_add(1);
            self.consecutive_correct = 0;
        }
        self.is_learned = self.consecutive_correct >= LEARNED_STREAK;
        self.last_answered_at = Some(at);
    }

    pub fn attempts(&self) -> u32 {
        self.correct_count.saturating_add(self.incorrect_count)
    }

    /// Share of correct answers; 0 when never answered.
    pub fn accuracy(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 0.0;
        }
        self.correct_count as f64 / attempts as f64
    }
}

/// Terminal summary of one completed assessment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub grade: u32,
    pub theta_before: f64,
    pub theta_after: f64,
    pub pass_probability_before: f64,
    pub pass_probability_after: f64,
    pub mastered_before: usize,
    pub mastered_after: usize,
    pub score: u32,
    /// Primary-phase question count only
    pub total: u32,
}

/// Result of a pure ability update
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerOutcome {
    pub state: AbilityState,
    pub delta_theta: f64,
}
