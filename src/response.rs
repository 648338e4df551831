//! JSON envelopes for feed results, shaped the way the feed's HTTP API
//! answers: `{"urls": [...], "count": N}` for listings and
//! `{"success": true, "message": ..., "data": {...}}` for inserts.

use serde::{Deserialize, Serialize};

use crate::storage::{FeedError, UrlRecord};

pub const INSERT_SUCCESS_MESSAGE: &str = "URL added successfully to the feed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlListResponse {
    pub urls: Vec<UrlRecord>,
    pub count: usize,
}

impl From<Vec<UrlRecord>> for UrlListResponse {
    fn from(urls: Vec<UrlRecord>) -> Self {
        let count = urls.len();
        Self { urls, count }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlInsertResponse {
    pub success: bool,
    pub message: String,
    pub data: UrlRecord,
}

impl From<UrlRecord> for UrlInsertResponse {
    fn from(data: UrlRecord) -> Self {
        Self {
            success: true,
            message: INSERT_SUCCESS_MESSAGE.to_string(),
            data,
        }
    }
}

/// Error body paired with [`FeedError::status_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub detail: String,
}

impl From<&FeedError> for ErrorResponse {
    fn from(err: &FeedError) -> Self {
        Self {
            status: err.status_code(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MetaInfo, StoreFailure};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record() -> UrlRecord {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        UrlRecord {
            id: 1,
            url: "https://a.example".to_string(),
            meta_info: MetaInfo::new(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_list_response_shape() {
        let body = serde_json::to_value(UrlListResponse::from(vec![record()])).unwrap();
        assert_eq!(
            body,
            json!({
                "urls": [{
                    "id": 1,
                    "url": "https://a.example",
                    "meta_info": {},
                    "created_at": "2026-01-02T03:04:05Z",
                    "updated_at": "2026-01-02T03:04:05Z"
                }],
                "count": 1
            })
        );
    }

    #[test]
    fn test_empty_list_response() {
        let body = serde_json::to_value(UrlListResponse::from(Vec::new())).unwrap();
        assert_eq!(body, json!({"urls": [], "count": 0}));
    }

    #[test]
    fn test_insert_response_shape() {
        let body = serde_json::to_value(UrlInsertResponse::from(record())).unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!(INSERT_SUCCESS_MESSAGE));
        assert_eq!(body["data"]["url"], json!("https://a.example"));
    }

    #[test]
    fn test_error_response_for_duplicate() {
        let err = FeedError::DuplicateUrl {
            url: "https://a.example".to_string(),
        };
        assert_eq!(
            ErrorResponse::from(&err),
            ErrorResponse {
                status: 409,
                detail: "URL already exists in the database: https://a.example".to_string(),
            }
        );
    }

    #[test]
    fn test_error_response_for_retrieval_failure() {
        let err = FeedError::Retrieval {
            source: StoreFailure::Sqlx(sqlx::Error::PoolClosed),
        };
        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, 500);
        assert!(body.detail.starts_with("Failed to retrieve URLs"));
    }
}
