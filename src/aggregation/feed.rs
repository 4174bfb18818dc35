use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::leaderboard::is_public;
use crate::metrics::SessionMetrics;
use crate::models::{Session, SessionState};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub session_id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub metrics: SessionMetrics,
}

/// Posted sessions, most recently finished first.
pub fn build_feed(sessions: &[Session], limit: usize) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = sessions
        .iter()
        .filter(|session| is_public(session))
        .filter_map(|session| match &session.state {
            SessionState::Ended { ended_at, metrics } => Some(FeedItem {
                session_id: session.id.clone(),
                user_id: session.user_id.clone(),
                title: session.title.clone(),
                started_at: session.started_at,
                ended_at: *ended_at,
                metrics: *metrics,
            }),
            SessionState::Active { .. } => None,
        })
        .collect();

    items.sort_by(|a, b| {
        b.ended_at
            .cmp(&a.ended_at)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    items.truncate(limit);
    items
}
