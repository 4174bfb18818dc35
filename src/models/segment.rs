use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySegment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub locked_in: bool,
}

impl ActivitySegment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Last known point of a timeline and the classification in force from it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub at: DateTime<Utc>,
    pub locked_in: bool,
}

/// Closed segments plus the cursor the open tail runs from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub segments: Vec<ActivitySegment>,
    pub cursor: Cursor,
}

impl Timeline {
    /// Time before the first ping is unclassified.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            segments: Vec::new(),
            cursor: Cursor {
                at: started_at,
                locked_in: false,
            },
        }
    }
}
