//! Schema versioning for the SQLite history backend.
//!
//! Each entry in [`MIGRATIONS`] moves the schema from version `n - 1` to `n`.
//! Applied versions are recorded in `schema_migrations`; a database written
//! by a newer release is refused rather than downgraded.

use rusqlite::{params, Connection};

use crate::error::{HistoryError, Result};

/// Ordered `(version, sql)` steps.
const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
    CREATE TABLE history_items (
        key TEXT PRIMARY KEY,             -- waku:sds:history:<channel>
        value TEXT NOT NULL,              -- JSON array of stored messages
        updated_at INTEGER NOT NULL       -- local write time (Unix ms)
    );
    "#,
)];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = 1;

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let found = schema_version(conn)?;
    if found > CURRENT_VERSION {
        return Err(HistoryError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            found, CURRENT_VERSION
        )));
    }

    let pending: Vec<&(u32, &str)> = MIGRATIONS.iter().filter(|(v, _)| *v > found).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, now_millis()],
        )?;
        tracing::debug!("applied history schema v{}", version);
    }
    tx.commit()?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?)
}

/// Wall-clock milliseconds; 0 if the clock reads before the epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
