//! Assessment session state machine
//!
//! `Loading -> Assessment -> [Review] -> Finished`
//!
//! Primary answers are scored, persisted and only then committed in memory.
//! Missed items are replayed once in a review phase that never touches the
//! learner's state. Finishing appends a [`SessionRecord`].

pub mod practice;
pub mod question;
mod scoring;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use wordcat_algo::ability::hours_between;
use wordcat_algo::{
    AbilityState, AlgoConfig, CategoryWeights, Item, ProgressMap, SelectionContext,
    SelectionEngine, SessionRecord,
};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::store::{ProgressStore, StoreError};

pub use practice::PracticeController;
pub use question::Question;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Loading,
    Assessment,
    Review,
    Finished,
}

impl SessionPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Assessment => "assessment",
            SessionPhase::Review => "review",
            SessionPhase::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerFeedback {
    pub item_id: String,
    /// `None` when the question timed out
    pub selected: Option<usize>,
    pub is_correct: bool,
    pub correct_index: usize,
    pub correct_text: String,
    /// Global theta change; `None` for unscored review answers.
    pub delta_theta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerResult {
    Answered(AnswerFeedback),
    AlreadyAnswered,
    NoQuestion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next,
    ReviewStarted,
    Finished(SessionRecord),
    AwaitingAnswer,
    NotStarted,
    AlreadyFinished,
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

pub(crate) fn feedback_for(question: &Question, selected: Option<usize>) -> AnswerFeedback {
    AnswerFeedback {
        item_id: question.item_id.clone(),
        selected,
        is_correct: selected.is_some_and(|index| question.is_correct(index)),
        correct_index: question.correct_index,
        correct_text: question.correct_text().to_string(),
        delta_theta: None,
    }
}

pub struct SessionController {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    engine: SelectionEngine,
    weights: CategoryWeights,
    session_size: usize,
    grade: u32,
    rng: ChaCha8Rng,

    phase: SessionPhase,
    items: Vec<Item>,
    primary: Vec<usize>,
    review: Vec<usize>,
    misses: Vec<usize>,
    cursor: usize,
    current: Option<Question>,
    current_item: Option<usize>,
    answered: bool,

    ability: AbilityState,
    progress: ProgressMap,
    answered_ids: HashSet<String>,
    beginner_mode: bool,
    score: u32,
    theta_before: f64,
    pass_probability_before: f64,
    pass_probability_after: f64,
    mastered_before: usize,
    mastered_after: usize,
    record: Option<SessionRecord>,
}

impl SessionController {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ProgressStore>,
        clock: Arc<dyn Clock>,
        config: &AlgoConfig,
        grade: u32,
        seed: Option<u64>,
    ) -> Self {
        let ability = AbilityState::new(grade, clock.now());
        Self {
            catalog,
            store,
            clock,
            engine: SelectionEngine::from_config(config),
            weights: config.category_weights.clone(),
            session_size: config.selection.assessment_size,
            grade,
            rng: seeded_rng(seed),
            phase: SessionPhase::Loading,
            items: Vec::new(),
            primary: Vec::new(),
            review: Vec::new(),
            misses: Vec::new(),
            cursor: 0,
            current: None,
            current_item: None,
            answered: false,
            ability,
            progress: ProgressMap::new(),
            answered_ids: HashSet::new(),
            beginner_mode: true,
            score: 0,
            theta_before: 0.0,
            pass_probability_before: 0.0,
            pass_probability_after: 0.0,
            mastered_before: 0,
            mastered_after: 0,
            record: None,
        }
    }

    /// Loads the learner, selects the assessment and opens the first question.
    ///
    /// Calling it again after a successful start does nothing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Loading {
            return Ok(());
        }

        let now = self.clock.now();
        let items = self.catalog.items_for_grade(self.grade)?;
        let mut ability = self.store.load_or_create_ability(self.grade, now)?;
        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let progress = self.store.item_progress_for(&ids)?;
        let answered_ids: HashSet<String> = progress.keys().cloned().collect();

        let model = self.engine.model();
        let mastered_before = model.count_mastered(&ability, &items, &answered_ids);
        let beginner_mode = model.is_beginner(mastered_before);

        let primary: Vec<usize> = {
            let ctx = SelectionContext {
                state: &ability,
                progress: &progress,
                beginner_mode,
                now,
            };
            let index_of: HashMap<&str, usize> = items
                .iter()
                .enumerate()
                .map(|(index, item)| (item.id.as_str(), index))
                .collect();
            self.engine
                .select_assessment(&items, &ctx, self.session_size, &mut self.rng)
                .into_iter()
                .filter_map(|item| index_of.get(item.id.as_str()).copied())
                .collect()
        };

        let pass_probability_before = model.pass_probability(&ability, &items, &self.weights);
        let theta_before = ability.theta;

        if !beginner_mode {
            if let Some(last) = self.store.latest_session_record(self.grade)? {
                let hours = hours_between(last.timestamp, now);
                let penalty = model.apply_session_decay(&mut ability, hours);
                if penalty > 0.0 {
                    tracing::info!(grade = self.grade, hours, penalty, "session decay applied");
                }
            }
        }

        ability.session_count = ability.session_count.saturating_add(1);
        ability.updated_at = now;
        self.store.save_ability(&ability)?;

        let pass_probability_after = model.pass_probability(&ability, &items, &self.weights);
        let mastered_after = model.count_mastered(&ability, &items, &answered_ids);

        tracing::info!(
            grade = self.grade,
            items = primary.len(),
            beginner_mode,
            mastered = mastered_before,
            pass_probability = pass_probability_before,
            "assessment selected"
        );

        self.items = items;
        self.primary = primary;
        self.ability = ability;
        self.progress = progress;
        self.answered_ids = answered_ids;
        self.beginner_mode = beginner_mode;
        self.theta_before = theta_before;
        self.pass_probability_before = pass_probability_before;
        self.pass_probability_after = pass_probability_after;
        self.mastered_before = mastered_before;
        self.mastered_after = mastered_after;
        self.phase = SessionPhase::Assessment;

        if self.primary.is_empty() {
            tracing::warn!(
                grade = self.grade,
                "no eligible items, finishing immediately"
            );
            self.complete()?;
        } else {
            self.present();
        }
        Ok(())
    }

    pub fn select_answer(&mut self, index: usize) -> Result<AnswerResult, SessionError> {
        self.answer(Some(index))
    }

    /// Scores the current question as incorrect.
    pub fn time_up(&mut self) -> Result<AnswerResult, SessionError> {
        self.answer(None)
    }

    fn answer(&mut self, selected: Option<usize>) -> Result<AnswerResult, SessionError> {
        let (Some(question), Some(item_index)) = (self.current.as_ref(), self.current_item) else {
            return Ok(AnswerResult::NoQuestion);
        };
        if self.answered {
            return Ok(AnswerResult::AlreadyAnswered);
        }

        let mut feedback = feedback_for(question, selected);

        if self.phase == SessionPhase::Assessment {
            let item = &self.items[item_index];
            let scored = scoring::score_and_persist(
                self.store.as_ref(),
                self.engine.model(),
                &self.ability,
                self.progress.get(&item.id),
                item,
                feedback.is_correct,
                self.beginner_mode,
                self.clock.now(),
            )?;

            self.ability = scored.state;
            self.progress.insert(item.id.clone(), scored.progress);
            self.answered_ids.insert(item.id.clone());
            if feedback.is_correct {
                self.score += 1;
            } else {
                self.misses.push(item_index);
            }

            let model = self.engine.model();
            self.pass_probability_after =
                model.pass_probability(&self.ability, &self.items, &self.weights);
            self.mastered_after =
                model.count_mastered(&self.ability, &self.items, &self.answered_ids);
            feedback.delta_theta = Some(scored.delta_theta);
        }

        self.answered = true;
        Ok(AnswerResult::Answered(feedback))
    }

    /// Moves past an answered question.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.phase {
            SessionPhase::Loading => return Ok(Advance::NotStarted),
            SessionPhase::Finished => return Ok(Advance::AlreadyFinished),
            SessionPhase::Assessment | SessionPhase::Review => {}
        }

        if self.current.is_some() && !self.answered {
            return Ok(Advance::AwaitingAnswer);
        }

        if self.current.is_some() && self.cursor + 1 < self.queue().len() {
            self.cursor += 1;
            self.present();
            return Ok(Advance::Next);
        }

        if self.phase == SessionPhase::Assessment && !self.misses.is_empty() {
            self.review = self.misses.clone();
            self.phase = SessionPhase::Review;
            self.cursor = 0;
            self.present();
            tracing::debug!(
                grade = self.grade,
                review = self.review.len(),
                "review started"
            );
            return Ok(Advance::ReviewStarted);
        }

        let record = self.complete()?;
        Ok(Advance::Finished(record))
    }

    fn queue(&self) -> &[usize] {
        match self.phase {
            SessionPhase::Review => &self.review,
            _ => &self.primary,
        }
    }

    fn present(&mut self) {
        let Some(index) = self.queue().get(self.cursor).copied() else {
            self.current = None;
            self.current_item = None;
            return;
        };
        let question = question::build_question(&self.items[index], &self.items, &mut self.rng);
        self.current = Some(question);
        self.current_item = Some(index);
        self.answered = false;
    }

    fn complete(&mut self) -> Result<SessionRecord, SessionError> {
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: self.clock.now(),
            grade: self.grade,
            theta_before: self.theta_before,
            theta_after: self.ability.theta,
            pass_probability_before: self.pass_probability_before,
            pass_probability_after: self.pass_probability_after,
            mastered_before: self.mastered_before,
            mastered_after: self.mastered_after,
            score: self.score,
            total: self.primary.len() as u32,
        };
        self.store.append_session_record(&record)?;

        tracing::info!(
            grade = self.grade,
            score = record.score,
            total = record.total,
            theta_before = record.theta_before,
            theta_after = record.theta_after,
            "session finished"
        );

        self.phase = SessionPhase::Finished;
        self.current = None;
        self.current_item = None;
        self.record = Some(record.clone());
        Ok(record)
    }

    // ==================== Observable state ====================

    pub fn grade(&self) -> u32 {
        self.grade
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn primary_total(&self) -> usize {
        self.primary.len()
    }

    /// 1-based position in the current queue; 0 without a question.
    pub fn question_number(&self) -> usize {
        if self.current.is_some() {
            self.cursor + 1
        } else {
            0
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue().len()
    }

    /// Item ids missed in the primary phase, in the order they were missed.
    pub fn missed_ids(&self) -> Vec<&str> {
        self.misses
            .iter()
            .map(|index| self.items[*index].id.as_str())
            .collect()
    }

    pub fn beginner_mode(&self) -> bool {
        self.beginner_mode
    }

    pub fn theta_before(&self) -> f64 {
        self.theta_before
    }

    pub fn pass_probability_before(&self) -> f64 {
        self.pass_probability_before
    }

    pub fn pass_probability_after(&self) -> f64 {
        self.pass_probability_after
    }

    pub fn mastered_before(&self) -> usize {
        self.mastered_before
    }

    pub fn mastered_after(&self) -> usize {
        self.mastered_after
    }

    pub fn ability(&self) -> &AbilityState {
        &self.ability
    }

    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }
}
