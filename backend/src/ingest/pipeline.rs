//! Shared fetch / decode / persist harness for every feed

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ApiCallLog, FeedKind, RawContent, RawPayload};

use crate::error::{AppError, AppResult};
use crate::external::{FeedClient, FeedResponse};
use crate::repository::Repository;

/// Reference to the raw payload a batch of records was derived from
#[derive(Debug, Clone, Copy)]
pub struct RawRef {
    pub id: i64,
    pub fetched_at: DateTime<Utc>,
}

/// Per-feed decoding and normalization strategy
#[async_trait]
pub trait FeedFormat: Send + Sync {
    /// Structurally decoded upstream body
    type Decoded: Send;
    /// Normalized record written by `persist`
    type Record: Send;

    fn feed(&self) -> FeedKind;

    /// Location the raw payload belongs to, if any
    fn location(&self) -> Option<&str>;

    /// File extension when the payload is archived on disk instead of inline
    fn archive_extension(&self, _decoded: &Self::Decoded) -> Option<&'static str> {
        None
    }

    /// Structural decode. Failing here means nothing is written.
    fn decode(&self, body: &[u8]) -> AppResult<Self::Decoded>;

    /// Convert into normalized records. Runs after the raw write.
    async fn transform(&self, decoded: Self::Decoded, raw: RawRef) -> AppResult<Vec<Self::Record>>;

    /// Write the records, returning how many were stored
    async fn persist(&self, repo: &dyn Repository, records: Vec<Self::Record>) -> AppResult<usize>;
}

/// Drives one upstream call through decode, raw write, normalization and audit
pub struct IngestPipeline {
    client: FeedClient,
    repo: Arc<dyn Repository>,
    data_dir: PathBuf,
}

impl IngestPipeline {
    pub fn new(client: FeedClient, repo: Arc<dyn Repository>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            repo,
            data_dir: data_dir.into(),
        }
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Fetch a single URL and ingest it
    pub async fn ingest<F: FeedFormat>(&self, format: &F, url: &str, target: &str) -> AppResult<usize> {
        let urls = [url.to_string()];
        self.ingest_first(format, &urls, target).await
    }

    /// Try each URL in order until one answers 2xx, then ingest that response.
    ///
    /// Every call that produced an HTTP response is audited, whether or not
    /// its body was usable.
    pub async fn ingest_first<F: FeedFormat>(
        &self,
        format: &F,
        urls: &[String],
        target: &str,
    ) -> AppResult<usize> {
        let mut last_error = AppError::MissingConfig(format!("no source URL for {}", target));

        for url in urls {
            let requested_at = Utc::now();
            let response = match self.client.get(url).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(feed = %format.feed(), endpoint = %url, "Upstream call failed: {}", e);
                    last_error = e;
                    continue;
                }
            };

            if !response.is_success() {
                self.audit(url, &response, requested_at).await;
                tracing::warn!(
                    feed = %format.feed(),
                    endpoint = %url,
                    status = response.status,
                    "Upstream returned non-success status"
                );
                last_error = AppError::UpstreamStatus {
                    endpoint: url.clone(),
                    status: response.status,
                };
                continue;
            }

            let outcome = self.process(format, &response, target).await;
            self.audit(url, &response, requested_at).await;

            if let Ok(count) = &outcome {
                tracing::info!(
                    feed = %format.feed(),
                    endpoint = %url,
                    bytes = response.body.len(),
                    records = count,
                    "Feed ingested"
                );
            }
            return outcome;
        }

        Err(last_error)
    }

    async fn process<F: FeedFormat>(
        &self,
        format: &F,
        response: &FeedResponse,
        target: &str,
    ) -> AppResult<usize> {
        let decoded = format.decode(&response.body)?;

        let fetched_at = Utc::now();
        let content = match format.archive_extension(&decoded) {
            Some(ext) => {
                let path = self
                    .archive(format.feed(), target, ext, fetched_at, &response.body)
                    .await?;
                RawContent::File(path.to_string_lossy().into_owned())
            }
            None => RawContent::Bytes(response.body.clone()),
        };

        let raw = RawPayload {
            feed: format.feed(),
            location: format.location().map(str::to_string),
            fetched_at,
            content,
        };
        let raw_id = self.repo.insert_raw(&raw).await?;

        let records = format
            .transform(
                decoded,
                RawRef {
                    id: raw_id,
                    fetched_at,
                },
            )
            .await?;
        format.persist(self.repo.as_ref(), records).await
    }

    /// Write a document or image to `<data_dir>/<feed>/<timestamp>_<target>.<ext>`
    async fn archive(
        &self,
        feed: FeedKind,
        target: &str,
        ext: &str,
        fetched_at: DateTime<Utc>,
        body: &[u8],
    ) -> AppResult<PathBuf> {
        let dir = self.data_dir.join(feed.as_str());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!(
            "{}_{}.{}",
            fetched_at.format("%Y%m%d%H%M%S"),
            sanitize_file_component(target),
            ext
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }

    async fn audit(&self, endpoint: &str, response: &FeedResponse, requested_at: DateTime<Utc>) {
        let log = ApiCallLog {
            endpoint: endpoint.to_string(),
            bytes: response.body.len() as i64,
            status: response.status,
            requested_at,
        };
        if let Err(e) = self.repo.insert_api_call(&log).await {
            tracing::warn!(endpoint = %endpoint, "Failed to record API call: {}", e);
        }
    }
}

fn sanitize_file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_component() {
        assert_eq!(sanitize_file_component("vadodara"), "vadodara");
        assert_eq!(sanitize_file_component("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_file_component("NDL 1"), "NDL_1");
    }
}
