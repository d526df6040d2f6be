//! Progress storage
//!
//! The session layer talks to persistence only through [`ProgressStore`].
//! Two implementations ship with the crate:
//! - [`MemoryStore`] - process-local, for tests and ephemeral runs
//! - [`SqliteStore`] - single-file SQLite database with schema migrations

pub mod memory;
pub mod migrations;
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use wordcat_algo::{AbilityState, ItemProgress, ProgressMap, SessionRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// ============================================================
// 错误类型定义
// ============================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================
// ProgressStore
// ============================================================

/// Learner-side persistence. Implementations must tolerate a single writer
/// per grade; the session layer never issues concurrent mutations.
pub trait ProgressStore: Send + Sync {
    /// Ability state for `grade`, created (and persisted) on first access
    /// with `updated_at = now`.
    fn load_or_create_ability(&self, grade: u32, now: DateTime<Utc>) -> StoreResult<AbilityState>;

    fn save_ability(&self, state: &AbilityState) -> StoreResult<()>;

    fn item_progress(&self, item_id: &str) -> StoreResult<Option<ItemProgress>>;

    /// Progress for every id in `item_ids` that has a record.
    fn item_progress_for(&self, item_ids: &[String]) -> StoreResult<ProgressMap>;

    fn save_item_progress(&self, progress: &ItemProgress) -> StoreResult<()>;

    fn append_session_record(&self, record: &SessionRecord) -> StoreResult<()>;

    /// Most recent record for `grade` by timestamp.
    fn latest_session_record(&self, grade: u32) -> StoreResult<Option<SessionRecord>>;

    /// Drops every ability state, progress record and session record.
    fn reset(&self) -> StoreResult<()>;
}
