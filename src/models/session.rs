//! Session-related data models.
//!
//! A session is `Active` while pings are still arriving and `Ended` once its metrics have been
//! frozen. Only `title` and `is_posted` change after that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::SessionMetrics;
use crate::models::segment::{ActivitySegment, Cursor, Timeline};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionState {
    #[serde(rename_all = "camelCase")]
    Active { cursor: Cursor },
    #[serde(rename_all = "camelCase")]
    Ended {
        ended_at: DateTime<Utc>,
        metrics: SessionMetrics,
    },
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active { .. } => "Active",
            SessionState::Ended { .. } => "Ended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub is_posted: bool,
    pub segments: Vec<ActivitySegment>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn start(id: String, user_id: &str, title: Option<String>, started_at: DateTime<Utc>) -> Self {
        let timeline = Timeline::new(started_at);
        Self {
            id,
            user_id: user_id.to_string(),
            title,
            started_at,
            is_posted: false,
            segments: timeline.segments,
            state: SessionState::Active {
                cursor: timeline.cursor,
            },
            created_at: started_at,
            updated_at: started_at,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, SessionState::Ended { .. })
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SessionState::Active { .. } => None,
            SessionState::Ended { ended_at, .. } => Some(*ended_at),
        }
    }

    /// The editable timeline; `None` once the session has ended.
    pub fn timeline(&self) -> Option<Timeline> {
        match &self.state {
            SessionState::Active { cursor } => Some(Timeline {
                segments: self.segments.clone(),
                cursor: *cursor,
            }),
            SessionState::Ended { .. } => None,
        }
    }

    pub fn apply_timeline(&mut self, timeline: Timeline, updated_at: DateTime<Utc>) {
        self.segments = timeline.segments;
        self.state = SessionState::Active {
            cursor: timeline.cursor,
        };
        self.updated_at = updated_at;
    }
}

/// Session fields without the segment list, for lists and detail headers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_posted: bool,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            title: session.title.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at(),
            is_posted: session.is_posted,
        }
    }
}
