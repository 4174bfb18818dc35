use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    aggregation::{
        build_dashboard, build_feed, rank_leaderboard, Dashboard, FeedItem, LeaderboardEntry,
        LeaderboardRange, TimeRange,
    },
    classify::{Domain, DomainClassifier},
    clock::Clock,
    error::EngineError,
    metrics::{self, SessionMetrics},
    models::{
        ActivityPing, ActivitySegment, DomainLabel, DomainOverride, Session, SessionSummary,
    },
    segmentation::{SegmentBuilder, SegmentationConfig},
    settings::EngineSettings,
    store::Store,
    tracker::locks::SessionLocks,
};
use crate::{log_debug, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Everything the session-detail view renders.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session: SessionSummary,
    pub segments: Vec<ActivitySegment>,
    pub metrics: SessionMetrics,
}

/// Request-facing entry point: loads from the store, runs the engine, writes results back.
///
/// Uploads, `end_session` and edits to a session are serialized per session id.
pub struct SessionTracker<S: Store, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
    settings: EngineSettings,
    segmentation: SegmentationConfig,
    locks: Arc<SessionLocks>,
}

impl<S: Store, C: Clock> Clone for SessionTracker<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
            segmentation: self.segmentation.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: Store, C: Clock> SessionTracker<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>, settings: EngineSettings) -> Self {
        Self {
            segmentation: settings.segmentation(),
            store,
            clock,
            settings,
            locks: Arc::new(SessionLocks::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        self.store.as_ref()
    }

    pub async fn start_session(&self, user_id: &str, title: Option<String>) -> Result<Session> {
        let session = Session::start(Uuid::new_v4().to_string(), user_id, title, self.clock.now());

        self.store
            .insert_session(&session)
            .await
            .context("failed to insert session")?;

        log_info!("Started session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Fold a ping batch into the session's timeline.
    ///
    /// A ping before the session start rejects the batch wholesale. Pings addressed to another
    /// session are dropped.
    pub async fn upload_activity(
        &self,
        user_id: &str,
        session_id: &str,
        pings: &[ActivityPing],
    ) -> Result<SessionDetail> {
        let _guard = self.lock(session_id).await?;

        let mut session = self.owned_session(user_id, session_id).await?;
        let timeline = session.timeline().ok_or_else(|| EngineError::SessionEnded {
            session_id: session_id.to_string(),
        })?;

        let (batch, foreign): (Vec<ActivityPing>, Vec<ActivityPing>) = pings
            .iter()
            .cloned()
            .partition(|ping| ping.session_id == session_id);
        if !foreign.is_empty() {
            log_warn!(
                "Dropped {} pings addressed to other sessions in upload for {}",
                foreign.len(),
                session_id
            );
        }

        let classifier = self.classifier_for(user_id).await?;
        let builder = SegmentBuilder::new(&classifier, &self.segmentation);
        let now = self.clock.now();
        let updated = builder
            .build(user_id, session.started_at, now, &timeline, &batch)
            .map_err(|err| {
                log_warn!("Rejected ping batch for session {}: {}", session_id, err);
                err
            })?;

        if updated != timeline {
            self.store
                .save_segments(session_id, &updated)
                .await
                .context("failed to save segments")?;
            log_debug!(
                "Session {} now has {} segments after {} pings",
                session_id,
                updated.segments.len(),
                batch.len()
            );
        }

        session.apply_timeline(updated, now);
        Ok(self.detail(&session, now))
    }

    /// Close the open tail at now and freeze the session's metrics.
    pub async fn end_session(&self, user_id: &str, session_id: &str) -> Result<SessionDetail> {
        let _guard = self.lock(session_id).await?;

        let session = self.owned_session(user_id, session_id).await?;
        if session.is_ended() {
            return Err(EngineError::SessionEnded {
                session_id: session_id.to_string(),
            }
            .into());
        }

        let now = self.clock.now();
        let ended = metrics::freeze(session, now, &self.segmentation);
        self.store
            .save_session(&ended)
            .await
            .context("failed to save ended session")?;

        let detail = self.detail(&ended, now);
        log_info!(
            "Ended session {}: {}s total, {}s locked in",
            session_id,
            detail.metrics.total_session_seconds,
            detail.metrics.locked_in_seconds
        );
        Ok(detail)
    }

    pub async fn session_detail(&self, user_id: &str, session_id: &str) -> Result<SessionDetail> {
        let session = self.owned_session(user_id, session_id).await?;
        Ok(self.detail(&session, self.clock.now()))
    }

    pub async fn rename_session(
        &self,
        user_id: &str,
        session_id: &str,
        title: Option<String>,
    ) -> Result<SessionSummary> {
        let _guard = self.lock(session_id).await?;

        let mut session = self.owned_session(user_id, session_id).await?;
        session.title = title;
        session.updated_at = self.clock.now();
        self.store
            .save_session(&session)
            .await
            .context("failed to rename session")?;
        Ok(SessionSummary::from(&session))
    }

    /// Only ended sessions can be posted; their metrics are final.
    pub async fn set_posted(
        &self,
        user_id: &str,
        session_id: &str,
        is_posted: bool,
    ) -> Result<SessionSummary> {
        let _guard = self.lock(session_id).await?;

        let mut session = self.owned_session(user_id, session_id).await?;
        if is_posted && !session.is_ended() {
            return Err(EngineError::SessionActive {
                session_id: session_id.to_string(),
            }
            .into());
        }

        session.is_posted = is_posted;
        session.updated_at = self.clock.now();
        self.store
            .save_session(&session)
            .await
            .context("failed to update session visibility")?;
        Ok(SessionSummary::from(&session))
    }

    pub async fn dashboard(&self, user_id: &str, utc_offset: FixedOffset) -> Result<Dashboard> {
        let now = self.clock.now();
        let today = TimeRange::today(now, utc_offset);
        let week = TimeRange::last_7_days(now);
        let earliest = match (today.start, week.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let sessions = self
            .store
            .get_sessions_in_range(
                user_id,
                &TimeRange {
                    start: earliest,
                    end: None,
                },
            )
            .await
            .context("failed to load sessions for dashboard")?;

        Ok(build_dashboard(
            user_id,
            &sessions,
            now,
            utc_offset,
            &self.segmentation,
        ))
    }

    pub async fn leaderboard(&self, range: LeaderboardRange) -> Result<Vec<LeaderboardEntry>> {
        let now = self.clock.now();
        let sessions = self
            .store
            .get_posted_sessions_in_range(&range.time_range(now))
            .await
            .context("failed to load sessions for leaderboard")?;
        Ok(rank_leaderboard(&sessions, range, now))
    }

    pub async fn feed(&self, limit: Option<usize>) -> Result<Vec<FeedItem>> {
        let sessions = self
            .store
            .get_posted_sessions_in_range(&TimeRange::all())
            .await
            .context("failed to load sessions for feed")?;
        Ok(build_feed(
            &sessions,
            limit.unwrap_or(self.settings.default_feed_limit),
        ))
    }

    pub async fn set_override(
        &self,
        user_id: &str,
        domain: &str,
        classification: DomainLabel,
    ) -> Result<DomainOverride> {
        let domain = Domain::parse(domain)?;
        let entry = DomainOverride {
            user_id: user_id.to_string(),
            domain: domain.as_str().to_string(),
            classification,
        };
        self.store
            .upsert_override(&entry)
            .await
            .context("failed to save domain override")?;
        Ok(entry)
    }

    pub async fn remove_override(&self, user_id: &str, domain: &str) -> Result<bool> {
        let domain = Domain::parse(domain)?;
        self.store
            .delete_override(user_id, domain.as_str())
            .await
            .context("failed to delete domain override")
    }

    pub async fn overrides(&self, user_id: &str) -> Result<Vec<DomainOverride>> {
        self.store
            .get_overrides(user_id)
            .await
            .context("failed to load domain overrides")
    }

    async fn classifier_for(&self, user_id: &str) -> Result<DomainClassifier> {
        let master = self
            .store
            .get_master_list()
            .await
            .context("failed to load master domain list")?;
        let overrides = self.overrides(user_id).await?;
        let classifier = DomainClassifier::new(&master, &overrides);
        log_debug!(
            "Classifier for {}: {} master entries, {} overrides",
            user_id,
            classifier.master_len(),
            overrides.len()
        );
        Ok(classifier)
    }

    async fn lock(&self, session_id: &str) -> Result<tokio::sync::OwnedMutexGuard<()>> {
        self.locks
            .acquire(session_id, self.settings.lock_timeout())
            .await
            .map_err(|err| {
                log_warn!("Lock contention on session {}", session_id);
                err.into()
            })
    }

    /// Sessions owned by someone else are reported as missing.
    async fn owned_session(&self, user_id: &str, session_id: &str) -> Result<Session> {
        let session = self
            .store
            .get_session(session_id)
            .await
            .with_context(|| format!("failed to load session {session_id}"))?;

        match session {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            }
            .into()),
        }
    }

    fn detail(&self, session: &Session, now: DateTime<Utc>) -> SessionDetail {
        SessionDetail {
            session: SessionSummary::from(session),
            segments: metrics::segments_at(session, now, &self.segmentation),
            metrics: metrics::for_session(session, now, &self.segmentation),
        }
    }
}
