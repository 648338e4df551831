use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use urlfeed::config::Config;
use urlfeed::response::{ErrorResponse, UrlInsertResponse, UrlListResponse};
use urlfeed::storage::{Database, DatabaseError, FeedError};
use urlfeed::util::{build_meta_info, strip_control_chars, truncate_to_width, LIST_URL_WIDTH};

/// Exit status for an insert rejected as a duplicate
const EXIT_DUPLICATE: i32 = 2;

/// Get the config directory path (~/.config/urlfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("urlfeed"))
}

/// Create the config directory if needed, user-only on Unix.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "urlfeed", about = "Catalogue URLs with metadata and list them newest first")]
struct Args {
    /// Database file (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/urlfeed/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a URL to the feed
    Add {
        url: String,

        /// Metadata entry; VALUE is parsed as JSON when possible (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Recorded as meta_info.added_by
        #[arg(long, value_name = "NAME")]
        added_by: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every URL, most recent first
    List {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // $HOME is only consulted for whichever of --config / --db is missing
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = match args.db.clone().or_else(|| config.database_path.clone()) {
        Some(path) => path,
        None => {
            let config_dir = get_config_dir()?;
            ensure_config_dir(&config_dir)?;
            config.database_path_or(&config_dir)
        }
    };
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    let db = match Database::open_with(db_path_str, &config.store_options()).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The database at {} is locked by another process.", db_path.display());
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let outcome = match args.command {
        Command::Add {
            url,
            meta,
            added_by,
            json,
        } => {
            let added_by = added_by.or_else(|| config.added_by.clone());
            add_url(&db, &url, &meta, added_by.as_deref(), json).await
        }
        Command::List { json } => list_urls(&db, json).await,
    };

    db.close().await;

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => match exit_status_for(&e) {
            Some(code) => {
                eprintln!("{}", e);
                std::process::exit(code);
            }
            None => Err(e),
        },
    }
}

/// Exit status for failures that are not reported as a generic error.
///
/// A duplicate URL is an expected outcome, so it gets its own status instead
/// of anyhow's error report and exit code 1.
fn exit_status_for(err: &anyhow::Error) -> Option<i32> {
    match err.downcast_ref::<FeedError>() {
        Some(feed_err) if feed_err.is_duplicate() => Some(EXIT_DUPLICATE),
        _ => None,
    }
}

async fn add_url(
    db: &Database,
    url: &str,
    meta: &[String],
    added_by: Option<&str>,
    json: bool,
) -> Result<()> {
    let meta_info = build_meta_info(meta, added_by)?;

    let record = match db.insert_url(url, meta_info).await {
        Ok(record) => record,
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            }
            return Err(e.into());
        }
    };

    if json {
        let body = UrlInsertResponse::from(record);
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("Added URL with ID: {}", record.id);
        println!("  URL: {}", strip_control_chars(&record.url));
        println!("  Created: {}", record.created_at.to_rfc3339());
        println!("  Metadata: {}", serde_json::Value::Object(record.meta_info));
    }
    Ok(())
}

async fn list_urls(db: &Database, json: bool) -> Result<()> {
    let records = db.list_urls().await?;

    if json {
        let body = UrlListResponse::from(records);
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No URLs in the feed.");
        return Ok(());
    }

    for (idx, record) in records.iter().enumerate() {
        let url = strip_control_chars(&record.url);
        println!(
            "{:>3}. {} (ID: {})",
            idx + 1,
            truncate_to_width(&url, LIST_URL_WIDTH),
            record.id
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use urlfeed::storage::StoreFailure;

    #[test]
    fn test_duplicate_maps_to_exit_status_two() {
        let err = anyhow::Error::from(FeedError::DuplicateUrl {
            url: "https://a.example".to_string(),
        });
        assert_eq!(exit_status_for(&err), Some(EXIT_DUPLICATE));
        assert_eq!(EXIT_DUPLICATE, 2);
    }

    #[test]
    fn test_other_failures_use_default_exit_status() {
        let insert = anyhow::Error::from(FeedError::Insert {
            url: "https://a.example".to_string(),
            source: StoreFailure::NoRowReturned,
        });
        assert_eq!(exit_status_for(&insert), None);
        assert_eq!(exit_status_for(&anyhow::anyhow!("boom")), None);
    }

    #[test]
    fn test_cli_parses_add_with_metadata() {
        let args = Args::try_parse_from([
            "urlfeed",
            "--db",
            "/tmp/feed.db",
            "add",
            "https://a.example",
            "--meta",
            "source=s3",
            "--meta",
            "rank=2",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/feed.db")));
        match args.command {
            Command::Add { url, meta, json, .. } => {
                assert_eq!(url, "https://a.example");
                assert_eq!(meta, vec!["source=s3", "rank=2"]);
                assert!(json);
            }
            other => panic!("expected add, got {other:?}"),
        }
    }
}
