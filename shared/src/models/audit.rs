//! Raw payload archive and outbound call audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::FeedKind;

/// Where the unmodified upstream content lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawContent {
    /// Response body stored inline (JSON feeds)
    Bytes(Vec<u8>),
    /// Document or image archived on disk
    File(String),
}

impl RawContent {
    pub fn len(&self) -> usize {
        match self {
            RawContent::Bytes(bytes) => bytes.len(),
            RawContent::File(path) => path.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An unmodified upstream response, kept for audit and re-processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPayload {
    pub feed: FeedKind,
    pub location: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub content: RawContent,
}

/// Audit record of one outbound upstream call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiCallLog {
    pub endpoint: String,
    pub bytes: i64,
    pub status: u16,
    pub requested_at: DateTime<Utc>,
}
