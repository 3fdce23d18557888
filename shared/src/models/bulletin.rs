use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summarized forecast text for a location, derived from a state bulletin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulletinRecord {
    pub location: String,
    pub raw_payload_id: Option<i64>,
    pub issued_at: DateTime<Utc>,
    pub text: String,
}
