//! SQLite persistence.
//!
//! One worker thread owns the connection; async callers hand it closures through
//! [`Database::execute`]. The repositories add typed queries on top, and this module wires them
//! into the [`Store`] contract the tracker consumes.

mod connection;
mod helpers;
mod migrations;
mod repositories;

pub use connection::{Database, DatabaseError};

use anyhow::Result;

use crate::aggregation::TimeRange;
use crate::models::{DomainOverride, MasterDomainEntry, Session, Timeline};
use crate::store::Store;

impl Store for Database {
    async fn get_master_list(&self) -> Result<Vec<MasterDomainEntry>> {
        self.list_master_domains().await
    }

    async fn upsert_master_entry(&self, entry: &MasterDomainEntry) -> Result<()> {
        self.put_master_domain(entry).await
    }

    async fn get_overrides(&self, user_id: &str) -> Result<Vec<DomainOverride>> {
        self.list_overrides_for(user_id).await
    }

    async fn upsert_override(&self, entry: &DomainOverride) -> Result<()> {
        self.put_override(entry).await
    }

    async fn delete_override(&self, user_id: &str, domain: &str) -> Result<bool> {
        self.remove_override(user_id, domain).await
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        self.create_session(session).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.load_session(session_id).await
    }

    async fn get_sessions_in_range(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<Session>> {
        self.load_sessions_for_user(user_id, range).await
    }

    async fn get_posted_sessions_in_range(&self, range: &TimeRange) -> Result<Vec<Session>> {
        self.load_posted_sessions(range).await
    }

    async fn save_segments(&self, session_id: &str, timeline: &Timeline) -> Result<()> {
        self.replace_timeline(session_id, timeline).await
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        self.update_session(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{self, SessionMetrics};
    use crate::models::{ActivitySegment, Cursor, DomainLabel, SessionState};
    use crate::segmentation::SegmentationConfig;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn open() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("lockin.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_active_session_round_trips_with_timeline() {
        let (_dir, db) = open();
        let session = Session::start("s1".into(), "u1", Some("focus".into()), at(0));
        db.insert_session(&session).await.unwrap();
        assert_eq!(db.get_session("s1").await.unwrap(), Some(session.clone()));
        assert_eq!(db.get_session("missing").await.unwrap(), None);

        let timeline = Timeline {
            segments: vec![ActivitySegment {
                start: at(0),
                end: at(90),
                locked_in: true,
            }],
            cursor: Cursor {
                at: at(90),
                locked_in: false,
            },
        };
        db.save_segments("s1", &timeline).await.unwrap();

        let loaded = db.get_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded.timeline(), Some(timeline));
        assert_eq!(loaded.title.as_deref(), Some("focus"));
    }

    #[tokio::test]
    async fn test_ended_session_keeps_frozen_metrics() {
        let (_dir, db) = open();
        let mut session = Session::start("s1".into(), "u1", None, at(0));
        session.state = SessionState::Active {
            cursor: Cursor {
                at: at(0),
                locked_in: true,
            },
        };
        db.insert_session(&session).await.unwrap();

        let mut ended = metrics::freeze(session, at(120), &SegmentationConfig::default());
        ended.is_posted = true;
        db.save_session(&ended).await.unwrap();

        let loaded = db.get_session("s1").await.unwrap().unwrap();
        assert_eq!(loaded, ended);
        assert_eq!(
            loaded.state,
            SessionState::Ended {
                ended_at: at(120),
                metrics: SessionMetrics::from_totals(120, 120),
            }
        );

        let frozen = Timeline::new(at(0));
        assert!(db.save_segments("s1", &frozen).await.is_err());
        assert!(db.save_segments("ghost", &frozen).await.is_err());
    }

    #[tokio::test]
    async fn test_range_queries_filter_and_order() {
        let (_dir, db) = open();
        for (id, user, start, posted) in [
            ("b", "u1", 3_600, false),
            ("a", "u1", 0, true),
            ("c", "u2", 1_800, true),
            ("d", "u1", 7_200, true),
        ] {
            let mut session = Session::start(id.into(), user, None, at(start));
            session.is_posted = posted;
            db.insert_session(&session).await.unwrap();
        }

        let ids = |sessions: Vec<Session>| -> Vec<String> {
            sessions.into_iter().map(|s| s.id).collect()
        };

        let mine = db
            .get_sessions_in_range("u1", &TimeRange::between(at(0), at(7_200)))
            .await
            .unwrap();
        assert_eq!(ids(mine), vec!["a", "b"]);

        let posted = db.get_posted_sessions_in_range(&TimeRange::all()).await.unwrap();
        assert_eq!(ids(posted), vec!["a", "c", "d"]);

        let recent = db
            .get_posted_sessions_in_range(&TimeRange::since(at(1)))
            .await
            .unwrap();
        assert_eq!(ids(recent), vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_sessions_error() {
        let (_dir, db) = open();
        let session = Session::start("s1".into(), "u1", None, at(0));
        db.insert_session(&session).await.unwrap();
        assert!(db.insert_session(&session).await.is_err());

        let ghost = Session::start("ghost".into(), "u1", None, at(0));
        assert!(db.save_session(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn test_domain_lists_upsert_and_delete() {
        let (_dir, db) = open();
        let mut master = MasterDomainEntry {
            domain: "github.com".into(),
            classification: DomainLabel::LockedIn,
        };
        db.upsert_master_entry(&master).await.unwrap();
        master.classification = DomainLabel::Distracting;
        db.upsert_master_entry(&master).await.unwrap();
        assert_eq!(db.get_master_list().await.unwrap(), vec![master]);

        let entry = DomainOverride {
            user_id: "u1".into(),
            domain: "github.com".into(),
            classification: DomainLabel::LockedIn,
        };
        db.upsert_override(&entry).await.unwrap();
        db.upsert_override(&entry).await.unwrap();
        assert_eq!(db.get_overrides("u1").await.unwrap(), vec![entry]);
        assert!(db.get_overrides("u2").await.unwrap().is_empty());

        assert!(db.delete_override("u1", "github.com").await.unwrap());
        assert!(!db.delete_override("u1", "github.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lockin.db");
        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_session(&Session::start("s1".into(), "u1", None, at(0)))
                .await
                .unwrap();
        }

        let db = Database::new(path).unwrap();
        assert!(db.get_session("s1").await.unwrap().is_some());
    }
}
