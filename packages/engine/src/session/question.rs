//! Multiple-choice question construction

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use wordcat_algo::{Category, Item};

/// Distractors per question
pub const DISTRACTOR_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub item_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub category: Category,
}

impl Question {
    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }
}

/// Phrase meaning when the item carries both a phrase and its meaning.
pub fn correct_answer_text(item: &Item) -> &str {
    match (&item.phrase, &item.phrase_meaning) {
        (Some(_), Some(meaning)) => meaning,
        _ => &item.meaning,
    }
}

pub fn prompt_text(item: &Item) -> &str {
    match (&item.phrase, &item.phrase_meaning) {
        (Some(phrase), Some(_)) => phrase,
        _ => &item.word,
    }
}

/// Up to `count` distinct answer texts from `pool`, never equal to the
/// target's own answer. Same-category items are preferred; the rest of the
/// pool tops up the shortfall.
pub fn pick_distractors<R: Rng + ?Sized>(
    target: &Item,
    pool: &[Item],
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct = correct_answer_text(target);
    let (mut same, mut other): (Vec<&Item>, Vec<&Item>) = pool
        .iter()
        .filter(|item| item.id != target.id)
        .partition(|item| item.category == target.category);
    same.shuffle(rng);
    other.shuffle(rng);

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(correct);
    let mut picked = Vec::with_capacity(count);

    for item in same.into_iter().chain(other) {
        if picked.len() >= count {
            break;
        }
        let text = correct_answer_text(item);
        if text.trim().is_empty() || !seen.insert(text) {
            continue;
        }
        picked.push(text.to_string());
    }
    picked
}

pub fn build_question<R: Rng + ?Sized>(item: &Item, pool: &[Item], rng: &mut R) -> Question {
    let correct = correct_answer_text(item).to_string();
    let mut options = pick_distractors(item, pool, DISTRACTOR_COUNT, rng);
    options.push(correct.clone());
    options.shuffle(rng);

    let correct_index = options
        .iter()
        .position(|option| *option == correct)
        .unwrap_or(0);

    Question {
        item_id: item.id.clone(),
        prompt: prompt_text(item).to_string(),
        options,
        correct_index,
        category: item.category,
    }
}
