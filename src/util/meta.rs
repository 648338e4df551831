use serde_json::Value;
use thiserror::Error;

use crate::storage::MetaInfo;

/// Key under which the caller identity is recorded in `meta_info`.
pub const ADDED_BY_KEY: &str = "added_by";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaArgError {
    #[error("Metadata argument {0:?} must have the form KEY=VALUE")]
    MissingSeparator(String),

    #[error("Metadata argument {0:?} has an empty key")]
    EmptyKey(String),
}

/// Parse one `KEY=VALUE` argument.
///
/// The value is read as JSON when it parses (`count=3`, `tags=["a"]`,
/// `draft=false`) and kept as a plain string otherwise. Only the first `=`
/// separates, so values may themselves contain `=`.
pub fn parse_meta_pair(arg: &str) -> Result<(String, Value), MetaArgError> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| MetaArgError::MissingSeparator(arg.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(MetaArgError::EmptyKey(arg.to_string()));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Build a metadata map from `KEY=VALUE` arguments, later keys winning.
///
/// `added_by`, when given, is written last and overrides any user-supplied
/// `added_by` entry. Returns `None` when there is nothing to record so the
/// store applies its empty-map default.
pub fn build_meta_info(
    args: &[String],
    added_by: Option<&str>,
) -> Result<Option<MetaInfo>, MetaArgError> {
    let mut meta = MetaInfo::new();
    for arg in args {
        let (key, value) = parse_meta_pair(arg)?;
        meta.insert(key, value);
    }

    if let Some(who) = added_by {
        meta.insert(ADDED_BY_KEY.to_string(), Value::String(who.to_string()));
    }

    Ok(if meta.is_empty() { None } else { Some(meta) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_value() {
        assert_eq!(
            parse_meta_pair("source=s3").unwrap(),
            ("source".to_string(), json!("s3"))
        );
    }

    #[test]
    fn test_json_values() {
        assert_eq!(parse_meta_pair("count=3").unwrap().1, json!(3));
        assert_eq!(parse_meta_pair("draft=false").unwrap().1, json!(false));
        assert_eq!(parse_meta_pair("tags=[\"a\",\"b\"]").unwrap().1, json!(["a", "b"]));
        assert_eq!(parse_meta_pair("nested={\"k\":1}").unwrap().1, json!({"k": 1}));
    }

    #[test]
    fn test_value_may_contain_equals() {
        assert_eq!(
            parse_meta_pair("query=a=b").unwrap(),
            ("query".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn test_empty_value_is_empty_string() {
        assert_eq!(parse_meta_pair("note=").unwrap().1, json!(""));
    }

    #[test]
    fn test_missing_separator() {
        assert_eq!(
            parse_meta_pair("source"),
            Err(MetaArgError::MissingSeparator("source".to_string()))
        );
    }

    #[test]
    fn test_empty_key() {
        assert!(matches!(
            parse_meta_pair(" =value"),
            Err(MetaArgError::EmptyKey(_))
        ));
    }

    #[test]
    fn test_build_meta_info_empty_is_none() {
        assert_eq!(build_meta_info(&[], None).unwrap(), None);
    }

    #[test]
    fn test_build_meta_info_added_by_wins() {
        let args = vec!["added_by=someone".to_string(), "bucket=b1".to_string()];
        let meta = build_meta_info(&args, Some("user-42")).unwrap().unwrap();
        assert_eq!(meta[ADDED_BY_KEY], json!("user-42"));
        assert_eq!(meta["bucket"], json!("b1"));
    }

    #[test]
    fn test_build_meta_info_later_keys_win() {
        let args = vec!["rank=1".to_string(), "rank=2".to_string()];
        let meta = build_meta_info(&args, None).unwrap().unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["rank"], json!(2));
    }

    proptest! {
        #[test]
        fn prop_plain_words_stay_strings(key in "[a-z_]{1,12}", value in "[a-z]{1,20}") {
            // "true"/"false"/"null" are JSON literals, not plain words
            prop_assume!(!matches!(value.as_str(), "true" | "false" | "null"));
            let (k, v) = parse_meta_pair(&format!("{key}={value}")).unwrap();
            prop_assert_eq!(k, key);
            prop_assert_eq!(v, Value::String(value));
        }

        #[test]
        fn prop_integers_parse_as_numbers(key in "[a-z]{1,8}", n in any::<i64>()) {
            let (_, v) = parse_meta_pair(&format!("{key}={n}")).unwrap();
            prop_assert_eq!(v, json!(n));
        }
    }
}
