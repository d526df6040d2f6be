//! 数据库迁移模块
//!
//! Versioned schema migrations for the SQLite store. Each migration runs in
//! its own transaction and is recorded in `schema_migrations`.

use std::collections::HashSet;

use rusqlite::{params, Connection};

use super::{StoreError, StoreResult};

/// 当前数据库 schema 版本
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

const INIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ability_state (
    grade INTEGER PRIMARY KEY,
    theta REAL NOT NULL,
    noun_theta REAL NOT NULL,
    verb_theta REAL NOT NULL,
    adjective_theta REAL NOT NULL,
    phrase_theta REAL NOT NULL,
    variance REAL NOT NULL,
    total_answered INTEGER NOT NULL DEFAULT 0,
    session_count INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_progress (
    item_id TEXT PRIMARY KEY,
    correct_count INTEGER NOT NULL DEFAULT 0,
    incorrect_count INTEGER NOT NULL DEFAULT 0,
    consecutive_correct INTEGER NOT NULL DEFAULT 0,
    is_learned INTEGER NOT NULL DEFAULT 0,
    last_answered_at INTEGER
);

CREATE TABLE IF NOT EXISTS session_record (
    id TEXT PRIMARY KEY,
    timestamp INTEGER NOT NULL,
    grade INTEGER NOT NULL,
    theta_before REAL NOT NULL,
    theta_after REAL NOT NULL,
    pass_probability_before REAL NOT NULL,
    pass_probability_after REAL NOT NULL,
    mastered_before INTEGER NOT NULL,
    mastered_after INTEGER NOT NULL,
    score INTEGER NOT NULL,
    total INTEGER NOT NULL
);
"#;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// 获取所有迁移定义，按版本号排序
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "initial schema",
            sql: INIT_SCHEMA,
        },
        Migration {
            version: 2,
            name: "session record lookup index",
            sql: "CREATE INDEX IF NOT EXISTS idx_session_record_grade_ts
                      ON session_record(grade, timestamp);",
        },
    ]
}

/// Applies every pending migration and returns the resulting version.
pub fn run_migrations(conn: &Connection) -> StoreResult<i32> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_versions(conn)?;
    let mut final_version = applied.iter().copied().max().unwrap_or(0);

    for migration in get_migrations() {
        if applied.contains(&migration.version) {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "running migration"
        );
        execute_migration_in_transaction(conn, &migration)?;
        final_version = migration.version;
    }

    tracing::debug!(
        version = final_version,
        target = CURRENT_SCHEMA_VERSION,
        "schema up to date"
    );
    Ok(final_version)
}

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

fn get_applied_versions(conn: &Connection) -> StoreResult<HashSet<i32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i32>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(versions)
}

fn execute_migration_in_transaction(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    conn.execute_batch("BEGIN IMMEDIATE")?;

    let result = conn.execute_batch(migration.sql).and_then(|_| {
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                chrono::Utc::now().timestamp_millis()
            ],
        )
    });

    match result {
        Ok(_) => {
            conn.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK").ok();
            tracing::error!(version = migration.version, error = %e, "migration failed");
            Err(StoreError::Migration(format!(
                "v{} ({}) failed: {}",
                migration.version, migration.name, e
            )))
        }
    }
}
