use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_error, DatabaseError};

/// Name of the single table backing the URL feed.
pub const URL_TABLE: &str = "url_recommendation_tmp";

// ============================================================================
// Store Options
// ============================================================================

/// Connection pool settings for [`Database::open_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before returning SQLITE_BUSY
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// Long-lived handle to the URL feed store.
///
/// Cloning is cheap and shares the underlying pool. Open once at startup,
/// pass it to whoever needs it, and call [`Database::close`] on shutdown.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database with default pool settings and run migrations.
    ///
    /// `path` may be `:memory:` for a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database lock, `DatabaseError::CannotOpen` if the file cannot be opened
    /// or created, `DatabaseError::Migration` if the schema could not be
    /// created, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        Self::open_with(path, &StoreOptions::default()).await
    }

    /// Open a database with explicit pool settings and run migrations.
    pub async fn open_with(path: &str, options: &StoreOptions) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Restrict a freshly created database file to the owner
        #[cfg(unix)]
        if path != ":memory:" {
            let db_path = std::path::Path::new(path);
            let parent_exists = db_path
                .parent()
                .is_some_and(|p| p.as_os_str().is_empty() || p.exists());
            if !db_path.exists() && parent_exists {
                use std::os::unix::fs::OpenOptionsExt;
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // If creation fails, SQLite reports the error at connect_with.
            }
        }

        // Every pooled connection inherits the busy timeout, so transient lock
        // contention between concurrent writers is absorbed by SQLite.
        let connect_options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DatabaseError::from_sqlx(e, path))?
            .busy_timeout(options.busy_timeout);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::from_sqlx(e, path))?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_error(&e) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;

        tracing::debug!(path = %path, max_connections = options.max_connections, "Opened URL feed database");
        Ok(db)
    }

    /// Close every pooled connection.
    ///
    /// Operations issued afterwards fail with their generic store failure.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Closed URL feed database");
    }

    /// True once [`Database::close`] has been called on this handle or a clone.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Create the URL table and its index inside one transaction.
    ///
    /// Every statement uses `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Timestamps are ISO 8601 UTC with millisecond precision so that
        // lexical order matches chronological order.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS url_recommendation_tmp (
                id INTEGER PRIMARY KEY,
                url TEXT UNIQUE NOT NULL CHECK (length(url) > 0),
                meta_info TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_url_recommendation_created ON url_recommendation_tmp(created_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open(":memory:").await.unwrap();
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {URL_TABLE}"))
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_marks_pool_closed() {
        let db = Database::open(":memory:").await.unwrap();
        assert!(!db.is_closed());
        db.close().await;
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_open_under_missing_directory_is_not_a_lock() {
        let path = std::env::temp_dir()
            .join("urlfeed_missing_dir_for_open_test")
            .join("feed.db");
        let path = path.to_str().unwrap();

        let err = match Database::open(path).await {
            Ok(_) => panic!("open should fail when the parent directory is missing"),
            Err(e) => e,
        };
        assert!(
            !matches!(err, DatabaseError::InstanceLocked),
            "missing directory reported as a lock: {err}"
        );
        match err {
            DatabaseError::CannotOpen { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected CannotOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_default_store_options() {
        let options = StoreOptions::default();
        assert_eq!(options.max_connections, 5);
        assert_eq!(options.acquire_timeout, Duration::from_secs(10));
        assert_eq!(options.busy_timeout, Duration::from_millis(5000));
    }
}
