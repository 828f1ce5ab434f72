//! SQLite connection pool with WAL mode.
//!
//! Report aggregation can run from several workers at once; WAL mode plus a
//! busy timeout lets those writers queue on the database lock instead of
//! failing outright.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// Tunables for the connection pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Upper bound on open connections.
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout_secs: u64,

    /// How long to wait for a free connection.
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout_secs: 30,
            acquire_timeout_secs: 10,
        }
    }
}

/// Create a new connection pool with WAL mode enabled, using default settings.
pub async fn create_pool(db_path: &Path) -> Result<DbPool, sqlx::Error> {
    create_pool_with(db_path, &PoolSettings::default()).await
}

/// Create a new connection pool with WAL mode enabled.
///
/// # Arguments
/// * `db_path` - Path to the SQLite database file
/// * `settings` - Connection limits and timeouts
///
/// # Returns
/// A connection pool ready for use
pub async fn create_pool_with(
    db_path: &Path,
    settings: &PoolSettings,
) -> Result<DbPool, sqlx::Error> {
    let db_url = format!("sqlite:{}", db_path.display());

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        // create_if_missing only creates the file, not its directories
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(settings.busy_timeout_secs))
        .pragma("wal_autocheckpoint", "1000");

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_with(connect_options)
        .await?;

    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;

    if mode.0.to_lowercase() != "wal" {
        log::warn!("[db] Expected WAL journal mode, got {}", mode.0);
    }

    Ok(pool)
}
