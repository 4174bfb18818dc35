use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::window::TimeRange;
use crate::metrics::focus_rate;
use crate::models::{Session, SessionState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardRange {
    Weekly,
    AllTime,
}

impl LeaderboardRange {
    pub fn time_range(&self, now: DateTime<Utc>) -> TimeRange {
        match self {
            LeaderboardRange::Weekly => TimeRange::iso_week(now),
            LeaderboardRange::AllTime => TimeRange::all(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub rank: u32,
    pub locked_in_seconds: u64,
    pub total_session_seconds: u64,
    pub focus_rate: f64,
    pub session_count: u64,
}

#[derive(Default)]
struct Tally {
    locked_in_seconds: u64,
    total_session_seconds: u64,
    session_count: u64,
    /// When the user's final locked-in total was reached.
    reached_at: Option<DateTime<Utc>>,
}

/// Only posted, ended sessions count; private sessions stay on the owner's dashboard.
pub fn is_public(session: &Session) -> bool {
    session.is_posted && session.is_ended()
}

/// Rank users by locked-in seconds over the range.
///
/// Ties go to whoever reached the tied total first, then to the lower user id.
pub fn rank_leaderboard(
    sessions: &[Session],
    range: LeaderboardRange,
    now: DateTime<Utc>,
) -> Vec<LeaderboardEntry> {
    let window = range.time_range(now);
    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();

    for session in sessions
        .iter()
        .filter(|session| is_public(session) && window.contains(session.started_at))
    {
        let SessionState::Ended { ended_at, metrics } = &session.state else {
            continue;
        };

        let tally = tallies.entry(session.user_id.as_str()).or_default();
        tally.session_count += 1;
        tally.total_session_seconds += metrics.total_session_seconds;
        if metrics.locked_in_seconds > 0 {
            tally.locked_in_seconds += metrics.locked_in_seconds;
            tally.reached_at = Some(tally.reached_at.map_or(*ended_at, |at| at.max(*ended_at)));
        }
    }

    let mut ranked: Vec<(&str, Tally)> = tallies.into_iter().collect();
    ranked.sort_by(|(a_user, a), (b_user, b)| {
        b.locked_in_seconds
            .cmp(&a.locked_in_seconds)
            .then_with(|| earlier_first(a.reached_at, b.reached_at))
            .then_with(|| a_user.cmp(b_user))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (user_id, tally))| LeaderboardEntry {
            user_id: user_id.to_string(),
            rank: u32::try_from(index + 1).unwrap_or(u32::MAX),
            locked_in_seconds: tally.locked_in_seconds,
            total_session_seconds: tally.total_session_seconds,
            focus_rate: focus_rate(tally.locked_in_seconds, tally.total_session_seconds),
            session_count: tally.session_count,
        })
        .collect()
}

fn earlier_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use chrono::{Duration, TimeZone};

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn posted(id: &str, user_id: &str, started_at: DateTime<Utc>, ended_at: DateTime<Utc>, locked: u64) -> Session {
        let total = u64::try_from((ended_at - started_at).num_seconds()).unwrap();
        let mut session = Session::start(id.into(), user_id, None, started_at);
        session.is_posted = true;
        session.state = SessionState::Ended {
            ended_at,
            metrics: SessionMetrics::from_totals(total, locked),
        };
        session
    }

    #[test]
    fn test_ranks_by_locked_in_not_focus_rate() {
        // u1: one minute at 100%; u2: two hours at 50%.
        let sessions = vec![
            posted("a", "u1", utc(6, 9), utc(6, 9) + Duration::minutes(1), 60),
            posted("b", "u2", utc(6, 10), utc(6, 12), 3600),
        ];

        let board = rank_leaderboard(&sessions, LeaderboardRange::AllTime, utc(7, 0));
        assert_eq!(board[0].user_id, "u2");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].focus_rate, 0.5);
        assert_eq!(board[1].user_id, "u1");
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn test_tie_goes_to_first_to_reach_total() {
        let sessions = vec![
            posted("a", "u-early", utc(6, 9), utc(6, 11), 3600),
            posted("b", "u-late", utc(6, 12), utc(6, 14), 3600),
            posted("c", "a-first-alphabetically", utc(6, 15), utc(6, 17), 3600),
        ];

        let board = rank_leaderboard(&sessions, LeaderboardRange::AllTime, utc(7, 0));
        let order: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["u-early", "u-late", "a-first-alphabetically"]);
    }

    #[test]
    fn test_simultaneous_tie_goes_to_lower_user_id() {
        let sessions = vec![
            posted("a", "u2", utc(6, 9), utc(6, 11), 3600),
            posted("b", "u1", utc(6, 9), utc(6, 11), 3600),
        ];

        let board = rank_leaderboard(&sessions, LeaderboardRange::AllTime, utc(7, 0));
        assert_eq!(board[0].user_id, "u1");
        assert_eq!(board[1].user_id, "u2");
    }

    #[test]
    fn test_only_posted_ended_sessions_count() {
        let mut private = posted("a", "u1", utc(6, 9), utc(6, 11), 7200);
        private.is_posted = false;
        let mut active = Session::start("b".into(), "u2", None, utc(6, 9));
        active.is_posted = true;
        let public = posted("c", "u3", utc(6, 9), utc(6, 10), 60);

        let board = rank_leaderboard(
            &[private, active, public],
            LeaderboardRange::AllTime,
            utc(7, 0),
        );
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, "u3");
    }

    #[test]
    fn test_weekly_excludes_previous_week() {
        // 2024-05-06 is a Monday.
        let sessions = vec![
            posted("a", "u1", utc(5, 9), utc(5, 12), 10_000),
            posted("b", "u2", utc(6, 9), utc(6, 10), 600),
        ];

        let weekly = rank_leaderboard(&sessions, LeaderboardRange::Weekly, utc(8, 12));
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].user_id, "u2");

        let all_time = rank_leaderboard(&sessions, LeaderboardRange::AllTime, utc(8, 12));
        assert_eq!(all_time[0].user_id, "u1");
    }

    #[test]
    fn test_zero_locked_users_rank_last() {
        let sessions = vec![
            posted("a", "u0", utc(6, 9), utc(6, 10), 0),
            posted("b", "u9", utc(6, 9), utc(6, 10), 1),
        ];

        let board = rank_leaderboard(&sessions, LeaderboardRange::AllTime, utc(7, 0));
        assert_eq!(board[0].user_id, "u9");
        assert_eq!(board[1].user_id, "u0");
        assert_eq!(board[1].locked_in_seconds, 0);
    }

    #[test]
    fn test_empty_input_gives_empty_board() {
        assert!(rank_leaderboard(&[], LeaderboardRange::Weekly, utc(7, 0)).is_empty());
    }
}
