use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use wordcat_algo::{AbilityState, ItemProgress, ProgressMap, SessionRecord};

use super::{ProgressStore, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    abilities: HashMap<u32, AbilityState>,
    progress: HashMap<String, ItemProgress>,
    records: Vec<SessionRecord>,
}

/// In-process store backed by a single `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All session records in append order.
    pub fn session_records(&self) -> Vec<SessionRecord> {
        self.inner.read().records.clone()
    }

    pub fn progress_count(&self) -> usize {
        self.inner.read().progress.len()
    }
}

impl ProgressStore for MemoryStore {
    fn load_or_create_ability(&self, grade: u32, now: DateTime<Utc>) -> StoreResult<AbilityState> {
        if let Some(state) = self.inner.read().abilities.get(&grade) {
            return Ok(state.clone());
        }
        let mut inner = self.inner.write();
        let state = inner
            .abilities
            .entry(grade)
            .or_insert_with(|| AbilityState::new(grade, now));
        Ok(state.clone())
    }

    fn save_ability(&self, state: &AbilityState) -> StoreResult<()> {
        self.inner
            .write()
            .abilities
            .insert(state.grade, state.clone());
        Ok(())
    }

    fn item_progress(&self, item_id: &str) -> StoreResult<Option<ItemProgress>> {
        Ok(self.inner.read().progress.get(item_id).cloned())
    }

    fn item_progress_for(&self, item_ids: &[String]) -> StoreResult<ProgressMap> {
        let inner = self.inner.read();
        Ok(item_ids
            .iter()
            .filter_map(|id| inner.progress.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    fn save_item_progress(&self, progress: &ItemProgress) -> StoreResult<()> {
        self.inner
            .write()
            .progress
            .insert(progress.item_id.clone(), progress.clone());
        Ok(())
    }

    fn append_session_record(&self, record: &SessionRecord) -> StoreResult<()> {
        self.inner.write().records.push(record.clone());
        Ok(())
    }

    fn latest_session_record(&self, grade: u32) -> StoreResult<Option<SessionRecord>> {
        Ok(self
            .inner
            .read()
            .records
            .iter()
            .filter(|r| r.grade == grade)
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    fn reset(&self) -> StoreResult<()> {
        *self.inner.write() = Inner::default();
        Ok(())
    }
}
