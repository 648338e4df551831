//! Helpers for the command-line front end.
//!
//! - **Metadata arguments**: turn `KEY=VALUE` pairs into a `meta_info` map
//! - **Text**: terminal-safe, width-aware display of stored URLs

mod meta;
mod text;

pub use meta::{build_meta_info, parse_meta_pair, MetaArgError, ADDED_BY_KEY};
pub use text::{strip_control_chars, truncate_to_width};

/// Column budget for a URL in the plain `list` output
pub const LIST_URL_WIDTH: usize = 80;
