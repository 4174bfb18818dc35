use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{self, focus_rate};
use crate::models::Session;
use crate::segmentation::SegmentationConfig;

pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Half-open `[start, end)` range over session start times; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }

    /// The user's local calendar day containing `now`.
    pub fn today(now: DateTime<Utc>, utc_offset: FixedOffset) -> Self {
        let local_midnight = now
            .with_timezone(&utc_offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let start = local_midnight.and_utc()
            - Duration::seconds(i64::from(utc_offset.local_minus_utc()));
        Self::between(start, start + Duration::seconds(SECS_PER_DAY))
    }

    /// Rolling 7×24h ending now, partial current day included.
    pub fn last_7_days(now: DateTime<Utc>) -> Self {
        Self::since(now - Duration::seconds(7 * SECS_PER_DAY))
    }

    /// ISO week (Monday 00:00 UTC) containing `now`.
    pub fn iso_week(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let start = monday.and_time(NaiveTime::MIN).and_utc();
        Self::between(start, start + Duration::days(7))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardWindow {
    pub session_count: u64,
    pub total_session_seconds: u64,
    pub locked_in_seconds: u64,
    pub average_focus_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: DashboardWindow,
    pub last_7_days: DashboardWindow,
}

/// Sum one user's sessions that started inside `range`.
///
/// The average is weighted by duration (Σlocked / Σtotal), so a short perfect session cannot
/// outweigh hours of real work. Active sessions contribute their live metrics as of `now`.
pub fn aggregate_window(
    user_id: &str,
    sessions: &[Session],
    range: &TimeRange,
    now: DateTime<Utc>,
    config: &SegmentationConfig,
) -> DashboardWindow {
    let mut window = DashboardWindow::default();

    for session in sessions
        .iter()
        .filter(|session| session.user_id == user_id && range.contains(session.started_at))
    {
        let session_metrics = metrics::for_session(session, now, config);
        window.session_count += 1;
        window.total_session_seconds += session_metrics.total_session_seconds;
        window.locked_in_seconds += session_metrics.locked_in_seconds;
    }

    window.average_focus_rate = focus_rate(window.locked_in_seconds, window.total_session_seconds);
    window
}

pub fn build_dashboard(
    user_id: &str,
    sessions: &[Session],
    now: DateTime<Utc>,
    utc_offset: FixedOffset,
    config: &SegmentationConfig,
) -> Dashboard {
    Dashboard {
        today: aggregate_window(
            user_id,
            sessions,
            &TimeRange::today(now, utc_offset),
            now,
            config,
        ),
        last_7_days: aggregate_window(
            user_id,
            sessions,
            &TimeRange::last_7_days(now),
            now,
            config,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SessionMetrics;
    use crate::models::{ActivitySegment, Cursor, SessionState, Timeline};
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn ended_session(
        id: &str,
        user_id: &str,
        started_at: DateTime<Utc>,
        total: u64,
        locked: u64,
    ) -> Session {
        let mut session = Session::start(id.into(), user_id, None, started_at);
        session.state = SessionState::Ended {
            ended_at: started_at + Duration::seconds(total as i64),
            metrics: SessionMetrics::from_totals(total, locked),
        };
        session
    }

    #[test]
    fn test_average_is_duration_weighted() {
        let config = SegmentationConfig::default();
        let start = utc(2024, 5, 6, 9, 0);
        let sessions = vec![
            ended_session("a", "u1", start, 600, 300),
            ended_session("b", "u1", start + Duration::hours(1), 400, 400),
        ];

        let window = aggregate_window("u1", &sessions, &TimeRange::all(), start, &config);

        assert_eq!(window.session_count, 2);
        assert_eq!(window.total_session_seconds, 1000);
        assert_eq!(window.locked_in_seconds, 700);
        assert!((window.average_focus_rate - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_window_is_zeroed() {
        let config = SegmentationConfig::default();
        let window = aggregate_window(
            "u1",
            &[],
            &TimeRange::all(),
            utc(2024, 5, 6, 9, 0),
            &config,
        );
        assert_eq!(window, DashboardWindow::default());
    }

    #[test]
    fn test_window_only_counts_owner_and_range() {
        let config = SegmentationConfig::default();
        let day = TimeRange::between(utc(2024, 5, 6, 0, 0), utc(2024, 5, 7, 0, 0));
        let sessions = vec![
            ended_session("a", "u1", utc(2024, 5, 6, 0, 0), 100, 50),
            ended_session("b", "u1", utc(2024, 5, 7, 0, 0), 100, 100),
            ended_session("c", "u2", utc(2024, 5, 6, 10, 0), 100, 100),
        ];

        let window = aggregate_window("u1", &sessions, &day, utc(2024, 5, 8, 0, 0), &config);
        assert_eq!(window.session_count, 1);
        assert_eq!(window.locked_in_seconds, 50);
    }

    #[test]
    fn test_active_session_counts_live() {
        let config = SegmentationConfig::default();
        let start = utc(2024, 5, 6, 9, 0);
        let mut session = Session::start("a".into(), "u1", None, start);
        session.apply_timeline(
            Timeline {
                segments: vec![ActivitySegment {
                    start,
                    end: start + Duration::seconds(60),
                    locked_in: false,
                }],
                cursor: Cursor {
                    at: start + Duration::seconds(60),
                    locked_in: true,
                },
            },
            start,
        );

        let window = aggregate_window(
            "u1",
            &[session],
            &TimeRange::all(),
            start + Duration::seconds(240),
            &config,
        );
        assert_eq!(window.total_session_seconds, 240);
        assert_eq!(window.locked_in_seconds, 180);
        assert_eq!(window.average_focus_rate, 0.75);
    }

    #[test]
    fn test_today_uses_local_midnight() {
        // 01:30 UTC is still the previous evening at UTC-05:00.
        let now = utc(2024, 5, 7, 1, 30);
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();

        let today = TimeRange::today(now, offset);
        assert_eq!(today.start, Some(utc(2024, 5, 6, 5, 0)));
        assert_eq!(today.end, Some(utc(2024, 5, 7, 5, 0)));

        let utc_today = TimeRange::today(now, FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc_today.start, Some(utc(2024, 5, 7, 0, 0)));
    }

    #[test]
    fn test_last_7_days_is_rolling() {
        let now = utc(2024, 5, 10, 15, 0);
        let range = TimeRange::last_7_days(now);
        assert!(range.contains(utc(2024, 5, 3, 15, 0)));
        assert!(!range.contains(utc(2024, 5, 3, 14, 59)));
        assert!(range.contains(now));
    }

    #[test]
    fn test_iso_week_starts_monday() {
        // 2024-05-12 is a Sunday.
        let week = TimeRange::iso_week(utc(2024, 5, 12, 23, 0));
        assert_eq!(week.start, Some(utc(2024, 5, 6, 0, 0)));
        assert_eq!(week.end, Some(utc(2024, 5, 13, 0, 0)));

        let monday = TimeRange::iso_week(utc(2024, 5, 13, 0, 0));
        assert_eq!(monday.start, Some(utc(2024, 5, 13, 0, 0)));
    }

    #[test]
    fn test_dashboard_today_and_week() {
        let config = SegmentationConfig::default();
        let now = utc(2024, 5, 10, 15, 0);
        let sessions = vec![
            ended_session("a", "u1", utc(2024, 5, 10, 9, 0), 600, 600),
            ended_session("b", "u1", utc(2024, 5, 8, 9, 0), 600, 0),
            ended_session("c", "u1", utc(2024, 4, 20, 9, 0), 600, 600),
        ];

        let dashboard = build_dashboard(
            "u1",
            &sessions,
            now,
            FixedOffset::east_opt(0).unwrap(),
            &config,
        );
        assert_eq!(dashboard.today.session_count, 1);
        assert_eq!(dashboard.today.average_focus_rate, 1.0);
        assert_eq!(dashboard.last_7_days.session_count, 2);
        assert_eq!(dashboard.last_7_days.average_focus_rate, 0.5);
    }
}
