//! SQLite 存储实现
//!
//! Timestamps are stored as epoch milliseconds. Counters that are `u64` in
//! memory are stored as `INTEGER` (i64); values beyond `i64::MAX` are rejected.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use wordcat_algo::{AbilityState, ItemProgress, ProgressMap, SessionRecord};

use super::migrations;
use super::{ProgressStore, StoreError, StoreResult};

/// 单文件 SQLite 存储
pub struct SqliteStore {
    connection: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path` and runs pending migrations.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StoreResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(&db_path)?;

        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        let store = Self {
            connection: Mutex::new(connection),
            db_path: path_str,
        };
        store.initialize()?;

        tracing::info!(path = %store.db_path, "sqlite store opened");
        Ok(store)
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            connection: Mutex::new(connection),
            db_path: ":memory:".to_string(),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> StoreResult<()> {
        let conn = self.get_connection()?;
        migrations::run_migrations(&conn)?;
        Ok(())
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn get_connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    fn insert_ability(conn: &Connection, state: &AbilityState) -> StoreResult<()> {
        conn.execute(
            "INSERT INTO ability_state (
                grade, theta, noun_theta, verb_theta, adjective_theta, phrase_theta,
                variance, total_answered, session_count, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(grade) DO UPDATE SET
                theta = excluded.theta,
                noun_theta = excluded.noun_theta,
                verb_theta = excluded.verb_theta,
                adjective_theta = excluded.adjective_theta,
                phrase_theta = excluded.phrase_theta,
                variance = excluded.variance,
                total_answered = excluded.total_answered,
                session_count = excluded.session_count,
                updated_at = excluded.updated_at",
            params![
                state.grade,
                state.theta,
                state.noun_theta,
                state.verb_theta,
                state.adjective_theta,
                state.phrase_theta,
                state.variance,
                to_i64(state.total_answered, "total_answered")?,
                to_i64(state.session_count, "session_count")?,
                state.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn query_progress(conn: &Connection, item_id: &str) -> StoreResult<Option<ItemProgress>> {
        let mut stmt = conn.prepare_cached(
            "SELECT item_id, correct_count, incorrect_count, consecutive_correct,
                    is_learned, last_answered_at
             FROM item_progress WHERE item_id = ?1",
        )?;
        let raw = stmt
            .query_row(params![item_id], ProgressRow::from_row)
            .optional()?;
        raw.map(ProgressRow::into_progress).transpose()
    }
}

// ============================================================
// 行映射
// ============================================================

struct AbilityRow {
    grade: u32,
    theta: f64,
    noun_theta: f64,
    verb_theta: f64,
    adjective_theta: f64,
    phrase_theta: f64,
    variance: f64,
    total_answered: i64,
    session_count: i64,
    updated_at: i64,
}

impl AbilityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            grade: row.get("grade")?,
            theta: row.get("theta")?,
            noun_theta: row.get("noun_theta")?,
            verb_theta: row.get("verb_theta")?,
            adjective_theta: row.get("adjective_theta")?,
            phrase_theta: row.get("phrase_theta")?,
            variance: row.get("variance")?,
            total_answered: row.get("total_answered")?,
            session_count: row.get("session_count")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_state(self) -> StoreResult<AbilityState> {
        Ok(AbilityState {
            grade: self.grade,
            theta: self.theta,
            noun_theta: self.noun_theta,
            verb_theta: self.verb_theta,
            adjective_theta: self.adjective_theta,
            phrase_theta: self.phrase_theta,
            variance: self.variance,
            total_answered: to_u64(self.total_answered, "total_answered")?,
            session_count: to_u64(self.session_count, "session_count")?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

struct ProgressRow {
    item_id: String,
    correct_count: u32,
    incorrect_count: u32,
    consecutive_correct: u32,
    is_learned: bool,
    last_answered_at: Option<i64>,
}

impl ProgressRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get("item_id")?,
            correct_count: row.get("correct_count")?,
            incorrect_count: row.get("incorrect_count")?,
            consecutive_correct: row.get("consecutive_correct")?,
            is_learned: row.get("is_learned")?,
            last_answered_at: row.get("last_answered_at")?,
        })
    }

    fn into_progress(self) -> StoreResult<ItemProgress> {
        Ok(ItemProgress {
            item_id: self.item_id,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            consecutive_correct: self.consecutive_correct,
            is_learned: self.is_learned,
            last_answered_at: self.last_answered_at.map(from_millis).transpose()?,
        })
    }
}

struct RecordRow {
    id: String,
    timestamp: i64,
    grade: u32,
    theta_before: f64,
    theta_after: f64,
    pass_probability_before: f64,
    pass_probability_after: f64,
    mastered_before: i64,
    mastered_after: i64,
    score: u32,
    total: u32,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            grade: row.get("grade")?,
            theta_before: row.get("theta_before")?,
            theta_after: row.get("theta_after")?,
            pass_probability_before: row.get("pass_probability_before")?,
            pass_probability_after: row.get("pass_probability_after")?,
            mastered_before: row.get("mastered_before")?,
            mastered_after: row.get("mastered_after")?,
            score: row.get("score")?,
            total: row.get("total")?,
        })
    }

    fn into_record(self) -> StoreResult<SessionRecord> {
        Ok(SessionRecord {
            id: self.id,
            timestamp: from_millis(self.timestamp)?,
            grade: self.grade,
            theta_before: self.theta_before,
            theta_after: self.theta_after,
            pass_probability_before: self.pass_probability_before,
            pass_probability_after: self.pass_probability_after,
            mastered_before: to_usize(self.mastered_before, "mastered_before")?,
            mastered_after: to_usize(self.mastered_after, "mastered_after")?,
            score: self.score,
            total: self.total,
        })
    }
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp out of range: {ms}")))
}

fn to_i64(value: u64, field: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{field} overflows: {value}")))
}

fn negative(field: &str, value: i64) -> StoreError {
    StoreError::InvalidData(format!("{field} is negative: {value}"))
}

fn to_u64(value: i64, field: &str) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| negative(field, value))
}

fn to_usize(value: i64, field: &str) -> StoreResult<usize> {
    usize::try_from(value).map_err(|_| negative(field, value))
}

// ============================================================
// ProgressStore 实现
// ============================================================

impl ProgressStore for SqliteStore {
    fn load_or_create_ability(&self, grade: u32, now: DateTime<Utc>) -> StoreResult<AbilityState> {
        let conn = self.get_connection()?;
        let existing = conn
            .query_row(
                "SELECT * FROM ability_state WHERE grade = ?1",
                params![grade],
                AbilityRow::from_row,
            )
            .optional()?;

        match existing {
            Some(row) => row.into_state(),
            None => {
                let state = AbilityState::new(grade, now);
                Self::insert_ability(&conn, &state)?;
                tracing::debug!(grade, "created initial ability state");
                Ok(state)
            }
        }
    }

    fn save_ability(&self, state: &AbilityState) -> StoreResult<()> {
        let conn = self.get_connection()?;
        Self::insert_ability(&conn, state)
    }

    fn item_progress(&self, item_id: &str) -> StoreResult<Option<ItemProgress>> {
        let conn = self.get_connection()?;
        Self::query_progress(&conn, item_id)
    }

    fn item_progress_for(&self, item_ids: &[String]) -> StoreResult<ProgressMap> {
        let conn = self.get_connection()?;
        let mut map = ProgressMap::with_capacity(item_ids.len());
        for id in item_ids {
            if let Some(progress) = Self::query_progress(&conn, id)? {
                map.insert(id.clone(), progress);
            }
        }
        Ok(map)
    }

    fn save_item_progress(&self, progress: &ItemProgress) -> StoreResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO item_progress (
                item_id, correct_count, incorrect_count, consecutive_correct,
                is_learned, last_answered_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(item_id) DO UPDATE SET
                correct_count = excluded.correct_count,
                incorrect_count = excluded.incorrect_count,
                consecutive_correct = excluded.consecutive_correct,
                is_learned = excluded.is_learned,
                last_answered_at = excluded.last_answered_at",
            params![
                progress.item_id,
                progress.correct_count,
                progress.incorrect_count,
                progress.consecutive_correct,
                progress.is_learned,
                progress.last_answered_at.map(|t| t.timestamp_millis()),
            ],
        )?;
        Ok(())
    }

    fn append_session_record(&self, record: &SessionRecord) -> StoreResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO session_record (
                id, timestamp, grade, theta_before, theta_after,
                pass_probability_before, pass_probability_after,
                mastered_before, mastered_after, score, total
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.timestamp.timestamp_millis(),
                record.grade,
                record.theta_before,
                record.theta_after,
                record.pass_probability_before,
                record.pass_probability_after,
                to_i64(record.mastered_before as u64, "mastered_before")?,
                to_i64(record.mastered_after as u64, "mastered_after")?,
                record.score,
                record.total,
            ],
        )?;
        Ok(())
    }

    fn latest_session_record(&self, grade: u32) -> StoreResult<Option<SessionRecord>> {
        let conn = self.get_connection()?;
        let raw = conn
            .query_row(
                "SELECT * FROM session_record WHERE grade = ?1
                 ORDER BY timestamp DESC LIMIT 1",
                params![grade],
                RecordRow::from_row,
            )
            .optional()?;
        raw.map(RecordRow::into_record).transpose()
    }

    fn reset(&self) -> StoreResult<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM ability_state;
             DELETE FROM item_progress;
             DELETE FROM session_record;",
        )?;
        tx.commit()?;
        tracing::info!(path = %self.db_path, "store reset");
        Ok(())
    }
}
