use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single client-reported observation of the active domain.
///
/// `domain` is whatever the client sent: a bare host or a full URL. It is normalized only at
/// classification time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPing {
    pub session_id: String,
    #[serde(alias = "url")]
    pub domain: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityPing {
    pub fn new(session_id: &str, domain: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            domain: domain.to_string(),
            timestamp,
        }
    }
}
