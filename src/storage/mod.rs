//! SQLite-backed store for the URL feed.
//!
//! [`Database`] is the single long-lived store handle. The feed operations
//! ([`Database::list_urls`], [`Database::insert_url`]) live in `urls.rs`.

mod schema;
mod types;
mod urls;

pub use schema::{Database, StoreOptions, URL_TABLE};
pub use types::{DatabaseError, FeedError, MetaInfo, StoreFailure, UrlRecord};
