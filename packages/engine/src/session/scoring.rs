//! Scored-answer persistence shared by the assessment and practice controllers.
//!
//! The next ability state and progress record are computed on copies and
//! written to the store before the caller commits them in memory, so a store
//! failure leaves the caller's state untouched.

use chrono::{DateTime, Utc};

use wordcat_algo::{AbilityModel, AbilityState, Item, ItemProgress};

use crate::store::{ProgressStore, StoreResult};

#[derive(Debug, Clone)]
pub(crate) struct ScoredAnswer {
    pub state: AbilityState,
    pub progress: ItemProgress,
    pub delta_theta: f64,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn score_and_persist(
    store: &dyn ProgressStore,
    model: &AbilityModel,
    state: &AbilityState,
    previous: Option<&ItemProgress>,
    item: &Item,
    is_correct: bool,
    beginner_mode: bool,
    now: DateTime<Utc>,
) -> StoreResult<ScoredAnswer> {
    let outcome = model.next_state(state, item, is_correct, beginner_mode, now);

    let mut progress = previous
        .cloned()
        .unwrap_or_else(|| ItemProgress::new(item.id.clone()));
    progress.record_answer(is_correct, now);

    store.save_ability(&outcome.state)?;
    store.save_item_progress(&progress)?;

    tracing::debug!(
        item_id = %item.id,
        is_correct,
        delta_theta = outcome.delta_theta,
        theta = outcome.state.theta,
        "answer scored"
    );

    Ok(ScoredAnswer {
        state: outcome.state,
        progress,
        delta_theta: outcome.delta_theta,
    })
}
