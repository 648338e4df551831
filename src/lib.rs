//! URL recommendation feed.
//!
//! Catalogues URLs with free-form JSON metadata in a single SQLite table and
//! lists them newest first. Inserting a URL that is already catalogued fails
//! with [`storage::FeedError::DuplicateUrl`]; every other store failure is
//! reported, never swallowed.
//!
//! ```no_run
//! use urlfeed::storage::{Database, FeedError};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let db = Database::open("feed.db").await?;
//! match db.insert_url("https://a.example", None).await {
//!     Ok(record) => println!("added {}", record.id),
//!     Err(FeedError::DuplicateUrl { url }) => println!("{url} is already in the feed"),
//!     Err(e) => return Err(e.into()),
//! }
//! for record in db.list_urls().await? {
//!     println!("{} {}", record.created_at, record.url);
//! }
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod response;
pub mod storage;
pub mod util;
