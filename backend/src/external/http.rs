//! HTTP transport for upstream feeds

use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, AppResult};

/// A fully buffered upstream response
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client used by every feed adapter
#[derive(Clone)]
pub struct FeedClient {
    http_client: Client,
}

impl FeedClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("weatherboy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Issue a GET and buffer the body.
    ///
    /// Only failures that produced no HTTP response are errors here; the
    /// caller decides what a non-2xx status means.
    pub async fn get(&self, url: &str) -> AppResult<FeedResponse> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Transport(format!("Reading body of {} failed: {}", url, e)))?;

        Ok(FeedResponse {
            status,
            body: body.to_vec(),
        })
    }
}
