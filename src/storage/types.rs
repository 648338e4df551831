use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Open-ended metadata attached to a URL record.
///
/// Always a JSON object; an absent value on insert becomes an empty map.
pub type MetaInfo = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while opening the store and running migrations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("The URL feed database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// The database file could not be opened or created (missing directory,
    /// permissions, not a database)
    #[error("Cannot open database at {path}: {source}")]
    CannotOpen {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error raised while opening `path`.
    ///
    /// Uses the primary result code (low byte of the extended code):
    /// SQLITE_BUSY (5) and SQLITE_LOCKED (6) mean another process holds the
    /// lock; SQLITE_CANTOPEN (14) means the file itself is unreachable.
    pub(crate) fn from_sqlx(err: sqlx::Error, path: &str) -> Self {
        if is_lock_error(&err) {
            return DatabaseError::InstanceLocked;
        }
        if primary_code(&err) == Some(SQLITE_CANTOPEN) {
            return DatabaseError::CannotOpen {
                path: path.to_string(),
                source: err,
            };
        }
        DatabaseError::Other(err)
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CANTOPEN: i32 = 14;

fn primary_code(err: &sqlx::Error) -> Option<i32> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xff)
}

pub(crate) fn is_lock_error(err: &sqlx::Error) -> bool {
    matches!(primary_code(err), Some(SQLITE_BUSY | SQLITE_LOCKED))
}

/// Underlying cause of a failed store round trip.
#[derive(Debug, Error)]
pub enum StoreFailure {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// meta_info could not be encoded or decoded as JSON
    #[error("invalid meta_info JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A returned row did not have the expected shape
    #[error("malformed record: {0}")]
    MalformedRow(String),

    /// The insert succeeded but the store returned nothing
    #[error("no data returned after insertion")]
    NoRowReturned,
}

impl StoreFailure {
    /// True when the store reported a uniqueness-constraint violation.
    ///
    /// Decided from the database error kind, never from message text.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreFailure::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Classified outcome of a URL feed operation.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A record with this URL already exists; nothing was written.
    #[error("URL already exists in the database: {url}")]
    DuplicateUrl { url: String },

    #[error("Failed to retrieve URLs: {source}")]
    Retrieval {
        #[source]
        source: StoreFailure,
    },

    #[error("Failed to insert URL {url}: {source}")]
    Insert {
        url: String,
        #[source]
        source: StoreFailure,
    },
}

impl FeedError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, FeedError::DuplicateUrl { .. })
    }

    /// HTTP status an API layer should answer with: 409 for a duplicate,
    /// 500 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            FeedError::DuplicateUrl { .. } => 409,
            FeedError::Retrieval { .. } | FeedError::Insert { .. } => 500,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A catalogued URL as stored in `url_recommendation_tmp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub meta_info: MetaInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row as returned by SQLite; converted via [`UrlRecordRow::into_record`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UrlRecordRow {
    pub id: i64,
    pub url: String,
    pub meta_info: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UrlRecordRow {
    pub(crate) fn into_record(self) -> Result<UrlRecord, StoreFailure> {
        let meta_info = match serde_json::from_str(&self.meta_info)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StoreFailure::MalformedRow(format!(
                    "meta_info for id {} is not an object: {}",
                    self.id, other
                )))
            }
        };

        Ok(UrlRecord {
            id: self.id,
            url: self.url,
            meta_info,
            created_at: parse_timestamp(self.id, "created_at", &self.created_at)?,
            updated_at: parse_timestamp(self.id, "updated_at", &self.updated_at)?,
        })
    }
}

fn parse_timestamp(id: i64, column: &str, raw: &str) -> Result<DateTime<Utc>, StoreFailure> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreFailure::MalformedRow(format!("{column} for id {id} ({raw:?}): {e}")))
}
