//! SQLite implementations of storage interfaces.
//!
//! All stores share one pool. Multi-row writes run inside `BEGIN IMMEDIATE`
//! so the write lock is taken upfront instead of being upgraded mid-transaction.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::config::SqliteConfig;
use crate::storage::{Result, StorageError};

mod content_store;
mod counter_store;
mod notification_store;
mod relation_store;
mod rows;

pub use content_store::SqliteContentStore;
pub use counter_store::SqliteCounterStore;
pub use notification_store::SqliteNotificationStore;
pub use relation_store::SqliteRelationStore;

/// SQLite result codes that mean "another writer holds the lock".
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StorageError::Conflict(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return StorageError::not_found("Referenced row", db.message());
            }
            let primary = db
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                .map(|code| code & 0xff);
            if matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED)) {
                return StorageError::Conflict(db.message().to_string());
            }
        }
        StorageError::Database(err)
    }
}

/// Open a pool for the configured database file.
///
/// `:memory:` opens a single-connection in-memory database.
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool> {
    if config.path == ":memory:" {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // The database lives exactly as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        return Ok(pool);
    }

    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(&config.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(opts)
        .await?;

    Ok(pool)
}

/// Apply the bundled migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    info!("SQLite migrations applied");
    Ok(())
}

/// Take the write lock for a multi-statement unit of work.
pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> Result<()> {
    // BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
    // when concurrent DEFERRED transactions race to upgrade from shared to exclusive.
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

/// Commit on success, roll back on failure, and hand back the work's result.
pub(crate) async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(value)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}
