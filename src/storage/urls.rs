use super::schema::Database;
use super::types::{FeedError, MetaInfo, StoreFailure, UrlRecord, UrlRecordRow};

impl Database {
    // ========================================================================
    // URL Feed Operations
    // ========================================================================

    /// List every URL record, most recently created first.
    ///
    /// Records sharing a `created_at` are ordered by descending id, so the
    /// order is stable across calls. An empty table yields an empty vector.
    ///
    /// # Errors
    ///
    /// Any store or decoding failure is returned as [`FeedError::Retrieval`].
    pub async fn list_urls(&self) -> Result<Vec<UrlRecord>, FeedError> {
        match self.fetch_all_urls().await {
            Ok(records) => {
                if records.is_empty() {
                    tracing::debug!("No URLs found in url_recommendation_tmp");
                } else {
                    tracing::debug!(count = records.len(), "Retrieved URLs from url_recommendation_tmp");
                }
                Ok(records)
            }
            Err(source) => {
                tracing::error!(error = %source, "Error retrieving URLs from url_recommendation_tmp");
                Err(FeedError::Retrieval { source })
            }
        }
    }

    async fn fetch_all_urls(&self) -> Result<Vec<UrlRecord>, StoreFailure> {
        let rows = sqlx::query_as::<_, UrlRecordRow>(
            r#"
            SELECT id, url, meta_info, created_at, updated_at
            FROM url_recommendation_tmp
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UrlRecordRow::into_record).collect()
    }

    /// Insert a new URL record and return it as stored.
    ///
    /// `url` is stored verbatim. A missing `meta_info` is stored as `{}`.
    /// There is no existence pre-check: the UNIQUE constraint on `url` is the
    /// only arbiter, so concurrent inserts of the same URL yield exactly one
    /// record.
    ///
    /// # Errors
    ///
    /// - [`FeedError::DuplicateUrl`] if the URL is already catalogued; nothing
    ///   is created or modified.
    /// - [`FeedError::Insert`] for every other failure.
    pub async fn insert_url(
        &self,
        url: &str,
        meta_info: Option<MetaInfo>,
    ) -> Result<UrlRecord, FeedError> {
        let meta_info = meta_info.unwrap_or_default();

        match self.insert_url_row(url, &meta_info).await {
            Ok(record) => {
                tracing::debug!(url = %url, id = record.id, "Inserted URL");
                Ok(record)
            }
            Err(source) if source.is_unique_violation() => {
                tracing::warn!(url = %url, "URL already exists");
                Err(FeedError::DuplicateUrl {
                    url: url.to_string(),
                })
            }
            Err(source) => {
                tracing::error!(url = %url, error = %source, "Error inserting URL into url_recommendation_tmp");
                Err(FeedError::Insert {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }

    async fn insert_url_row(&self, url: &str, meta_info: &MetaInfo) -> Result<UrlRecord, StoreFailure> {
        let encoded = serde_json::to_string(meta_info)?;

        let row = sqlx::query_as::<_, UrlRecordRow>(
            r#"
            INSERT INTO url_recommendation_tmp (url, meta_info)
            VALUES (?, ?)
            RETURNING id, url, meta_info, created_at, updated_at
        "#,
        )
        .bind(url)
        .bind(encoded)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreFailure::NoRowReturned)?.into_record()
    }
}
