#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use wordcat_algo::{
    AbilityState, AlgoConfig, Category, Item, ItemProgress, ProgressMap, SessionRecord,
};
use wordcat_engine::{
    JsonCatalog, ManualClock, MemoryStore, PracticeController, ProgressStore, Question,
    SessionController, StoreError, StoreResult,
};

pub const GRADE: u32 = 1;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn item(id: &str, category: Category, difficulty: f64, exam_frequency: u32) -> Item {
    Item {
        id: id.to_string(),
        grade: GRADE,
        word: format!("word-{id}"),
        meaning: format!("meaning-{id}"),
        phrase: None,
        phrase_meaning: None,
        category,
        difficulty,
        exam_frequency,
    }
}

/// `n` grade-1 items spread over the four tracked categories, all within the
/// beginner difficulty cap.
pub fn sample_items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| {
            item(
                &format!("w{i:03}"),
                Category::TRACKED[i % 4],
                -1.0 + (i % 15) as f64 * 0.1,
                (i % 5) as u32,
            )
        })
        .collect()
}

/// Any option other than the correct one.
pub fn wrong_choice(question: &Question) -> usize {
    (question.correct_index + 1) % question.options.len()
}

/// Config whose learners are never beginners.
pub fn advanced_config() -> AlgoConfig {
    let mut config = AlgoConfig::default();
    config.ability.beginner_mastery_threshold = 0;
    config
}

/// Memory store whose writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

impl ProgressStore for FlakyStore {
    fn load_or_create_ability(&self, grade: u32, now: DateTime<Utc>) -> StoreResult<AbilityState> {
        self.inner.load_or_create_ability(grade, now)
    }

    fn save_ability(&self, state: &AbilityState) -> StoreResult<()> {
        self.check()?;
        self.inner.save_ability(state)
    }

    fn item_progress(&self, item_id: &str) -> StoreResult<Option<ItemProgress>> {
        self.inner.item_progress(item_id)
    }

    fn item_progress_for(&self, item_ids: &[String]) -> StoreResult<ProgressMap> {
        self.inner.item_progress_for(item_ids)
    }

    fn save_item_progress(&self, progress: &ItemProgress) -> StoreResult<()> {
        self.check()?;
        self.inner.save_item_progress(progress)
    }

    fn append_session_record(&self, record: &SessionRecord) -> StoreResult<()> {
        self.check()?;
        self.inner.append_session_record(record)
    }

    fn latest_session_record(&self, grade: u32) -> StoreResult<Option<SessionRecord>> {
        self.inner.latest_session_record(grade)
    }

    fn reset(&self) -> StoreResult<()> {
        self.check()?;
        self.inner.reset()
    }
}

pub struct Harness {
    pub catalog: Arc<JsonCatalog>,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub config: AlgoConfig,
}

impl Harness {
    pub fn new(items: Vec<Item>) -> Self {
        Self::with_config(items, AlgoConfig::default())
    }

    pub fn with_config(items: Vec<Item>, config: AlgoConfig) -> Self {
        Self {
            catalog: Arc::new(JsonCatalog::new(items).unwrap()),
            store: Arc::new(FlakyStore::new()),
            clock: Arc::new(ManualClock::new(start_time())),
            config,
        }
    }

    pub fn session(&self, seed: u64) -> SessionController {
        SessionController::new(
            self.catalog.clone(),
            self.store.clone(),
            self.clock.clone(),
            &self.config,
            GRADE,
            Some(seed),
        )
    }

    pub fn practice(&self, seed: u64) -> PracticeController {
        PracticeController::new(
            self.catalog.clone(),
            self.store.clone(),
            self.clock.clone(),
            &self.config,
            GRADE,
            Some(seed),
        )
    }

    /// The persisted ability for [`GRADE`].
    pub fn stored_ability(&self) -> AbilityState {
        self.store
            .load_or_create_ability(GRADE, start_time())
            .unwrap()
    }

    /// Stores a finished session that ended `hours` before the clock's now.
    pub fn seed_previous_session(&self, hours: i64) {
        let record = SessionRecord {
            id: format!("previous-{hours}"),
            timestamp: start_time() - chrono::Duration::hours(hours),
            grade: GRADE,
            theta_before: 0.0,
            theta_after: 0.0,
            pass_probability_before: 0.0,
            pass_probability_after: 0.0,
            mastered_before: 0,
            mastered_after: 0,
            score: 0,
            total: 10,
        };
        self.store.inner().append_session_record(&record).unwrap();
    }
}
