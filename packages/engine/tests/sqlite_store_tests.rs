//! SQLite store persistence across reopen

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use common::{sample_items, GRADE};
use wordcat_algo::{AbilityState, AlgoConfig, ItemProgress, SessionRecord};
use wordcat_engine::{
    JsonCatalog, ManualClock, ProgressStore, SessionController, SessionPhase, SqliteStore,
};

fn open(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(dir.path().join("nested").join("wordcat.db")).unwrap()
}

fn record(id: &str, hours_ago: i64) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        timestamp: common::start_time() - Duration::hours(hours_ago),
        grade: GRADE,
        theta_before: -0.25,
        theta_after: 0.5,
        pass_probability_before: 0.31,
        pass_probability_after: 0.42,
        mastered_before: 3,
        mastered_after: 5,
        score: 7,
        total: 10,
    }
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let mut ability = AbilityState::new(GRADE, common::start_time());
    ability.theta = 0.75;
    ability.noun_theta = 1.5;
    ability.variance = 0.4;
    ability.total_answered = 42;
    ability.session_count = 4;

    let mut progress = ItemProgress::new("w001");
    for correct in [true, true, false, true] {
        progress.record_answer(correct, common::start_time());
    }

    {
        let store = open(&dir);
        store
            .load_or_create_ability(GRADE, common::start_time())
            .unwrap();
        store.save_ability(&ability).unwrap();
        store.save_item_progress(&progress).unwrap();
        store.append_session_record(&record("older", 30)).unwrap();
        store.append_session_record(&record("newer", 1)).unwrap();
    }

    let store = open(&dir);
    let reloaded = store.load_or_create_ability(GRADE, Utc::now()).unwrap();
    assert_eq!(reloaded, ability);
    assert_eq!(store.item_progress("w001").unwrap(), Some(progress));
    assert_eq!(
        store.latest_session_record(GRADE).unwrap(),
        Some(record("newer", 1))
    );
}

#[test]
fn reset_clears_everything() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let mut ability = AbilityState::new(GRADE, common::start_time());
    ability.theta = 2.0;
    store.save_ability(&ability).unwrap();
    let progress = ItemProgress::new("w001");
    store.save_item_progress(&progress).unwrap();
    store.append_session_record(&record("r", 1)).unwrap();

    store.reset().unwrap();

    assert_eq!(store.item_progress("w001").unwrap(), None);
    assert_eq!(store.latest_session_record(GRADE).unwrap(), None);
    let ability = store.load_or_create_ability(GRADE, Utc::now()).unwrap();
    assert_eq!(ability.theta, 0.0);
}

#[test]
fn session_over_sqlite_persists_record() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir));
    let catalog = Arc::new(JsonCatalog::new(sample_items(20)).unwrap());
    let clock = Arc::new(ManualClock::new(common::start_time()));

    let mut session = SessionController::new(
        catalog,
        store.clone(),
        clock,
        &AlgoConfig::default(),
        GRADE,
        Some(99),
    );
    session.start().unwrap();
    while let Some(question) = session.current_question().cloned() {
        session.select_answer(question.correct_index).unwrap();
        session.advance().unwrap();
    }
    assert_eq!(session.phase(), SessionPhase::Finished);
    drop(session);
    drop(store);

    let reopened = open(&dir);
    let latest = reopened.latest_session_record(GRADE).unwrap().unwrap();
    assert_eq!(latest.score, 10);
    assert_eq!(latest.total, 10);
    let ability = reopened.load_or_create_ability(GRADE, Utc::now()).unwrap();
    assert_eq!(ability.total_answered, 10);
    assert_eq!(ability.session_count, 1);
    assert_eq!(ability.theta, latest.theta_after);
}
