//! Continuous practice
//!
//! One question at a time, chosen by the adaptive selector. Answers update
//! ability and progress exactly like primary assessment answers; no session
//! record is written.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use rand_chacha::ChaCha8Rng;

use wordcat_algo::{AbilityState, AlgoConfig, Item, ProgressMap, SelectionEngine};

use super::question::{self, Question};
use super::{feedback_for, scoring, seeded_rng, AnswerResult, SessionError};
use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::store::ProgressStore;

/// Ids of the last few shown items, skipped while anything else is left.
pub const RECENT_WINDOW: usize = 5;

pub struct PracticeController {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    engine: SelectionEngine,
    grade: u32,
    rng: ChaCha8Rng,

    started: bool,
    items: Vec<Item>,
    ability: AbilityState,
    progress: ProgressMap,
    answered_ids: HashSet<String>,
    recent: VecDeque<String>,
    beginner_mode: bool,

    current: Option<Question>,
    current_item: Option<usize>,
    answered: bool,
    answered_count: u32,
    correct_count: u32,
}

impl PracticeController {
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
            grade,
            rng: seeded_rng(seed),
            started: false,
            items: Vec::new(),
            ability,
            progress: ProgressMap::new(),
            answered_ids: HashSet::new(),
            recent: VecDeque::with_capacity(RECENT_WINDOW),
            beginner_mode: true,
            current: None,
            current_item: None,
            answered: false,
            answered_count: 0,
            correct_count: 0,
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.started {
            return Ok(());
        }

        let now = self.clock.now();
        let items = self.catalog.items_for_grade(self.grade)?;
        let ability = self.store.load_or_create_ability(self.grade, now)?;
        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let progress = self.store.item_progress_for(&ids)?;

        self.answered_ids = progress.keys().cloned().collect();
        self.items = items;
        self.ability = ability;
        self.progress = progress;
        self.refresh_mode();
        self.started = true;

        tracing::info!(
            grade = self.grade,
            items = self.items.len(),
            beginner_mode = self.beginner_mode,
            "practice started"
        );
        Ok(())
    }

    fn refresh_mode(&mut self) {
        let model = self.engine.model();
        let mastered = model.count_mastered(&self.ability, &self.items, &self.answered_ids);
        self.beginner_mode = model.is_beginner(mastered);
    }

    /// Current question, or a freshly selected one once the previous was
    /// answered. `None` before `start` or for an empty grade.
    pub fn next_question(&mut self) -> Option<&Question> {
        if !self.started {
            return None;
        }
        if self.current.is_some() && !self.answered {
            return self.current.as_ref();
        }

        let recent: HashSet<String> = self.recent.iter().cloned().collect();
        let now = self.clock.now();
        let index = {
            let item = self
                .engine
                .select_next(&self.items, &recent, &self.progress, now, &mut self.rng)?;
            self.items.iter().position(|c| c.id == item.id)?
        };

        let item_id = self.items[index].id.clone();
        if self.recent.len() >= RECENT_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(item_id);

        self.current = Some(question::build_question(
            &self.items[index],
            &self.items,
            &mut self.rng,
        ));
        self.current_item = Some(index);
        self.answered = false;
        self.current.as_ref()
    }

    pub fn select_answer(&mut self, index: usize) -> Result<AnswerResult, SessionError> {
        self.answer(Some(index))
    }

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
        self.answered_count += 1;
        if feedback.is_correct {
            self.correct_count += 1;
        }
        self.refresh_mode();

        feedback.delta_theta = Some(scored.delta_theta);
        self.answered = true;
        Ok(AnswerResult::Answered(feedback))
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn ability(&self) -> &AbilityState {
        &self.ability
    }

    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    pub fn beginner_mode(&self) -> bool {
        self.beginner_mode
    }

    pub fn answered_count(&self) -> u32 {
        self.answered_count
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    /// Recently shown ids, oldest first.
    pub fn recent_ids(&self) -> Vec<&str> {
        self.recent.iter().map(String::as_str).collect()
    }
}
