use chrono::{DateTime, Utc};

use crate::classify::DomainClassifier;
use crate::error::EngineError;
use crate::models::{ActivityPing, ActivitySegment, Cursor, Timeline};
use crate::segmentation::config::SegmentationConfig;
use crate::segmentation::merge::append_span;

/// Folds ping batches into a session timeline.
pub struct SegmentBuilder<'a> {
    classifier: &'a DomainClassifier,
    config: &'a SegmentationConfig,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(classifier: &'a DomainClassifier, config: &'a SegmentationConfig) -> Self {
        Self { classifier, config }
    }

    /// Main segmentation function: applies one batch of pings to an existing timeline.
    ///
    /// The batch is validated as a whole: a single ping before `started_at`, or more than the
    /// allowed clock skew past `now`, rejects it and the timeline is left untouched. Pings stamped
    /// slightly ahead of `now` are pulled back to it. Pings at or before the cursor (late,
    /// duplicated or replayed) become zero-length transitions at the cursor, so replaying a batch
    /// is a no-op.
    pub fn build(
        &self,
        user_id: &str,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
        existing: &Timeline,
        pings: &[ActivityPing],
    ) -> Result<Timeline, EngineError> {
        // Edge case: empty batch
        if pings.is_empty() {
            return Ok(existing.clone());
        }

        if let Some(early) = pings.iter().find(|ping| ping.timestamp < started_at) {
            return Err(EngineError::OutOfRangeTimestamp {
                timestamp: early.timestamp,
                started_at,
            });
        }

        let latest_allowed = now + self.config.max_clock_skew();
        if let Some(ahead) = pings.iter().find(|ping| ping.timestamp > latest_allowed) {
            return Err(EngineError::FutureTimestamp {
                timestamp: ahead.timestamp,
                now,
            });
        }

        // Step 1: order the batch; ties broken by domain so the fold is deterministic
        let mut ordered: Vec<&ActivityPing> = pings.iter().collect();
        ordered.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.domain.cmp(&b.domain))
        });

        // Step 2: fold each ping into the timeline
        let mut segments = existing.segments.clone();
        let mut cursor = existing.cursor;

        for ping in ordered {
            let at = ping.timestamp.min(now).max(cursor.at);
            append_span(&mut segments, cursor.at, at, cursor.locked_in, self.config);
            cursor = Cursor {
                at,
                locked_in: self
                    .classifier
                    .classify(user_id, &ping.domain)
                    .is_locked_in(),
            };
        }

        Ok(Timeline { segments, cursor })
    }
}

/// Closed segments plus the open tail up to `until`.
///
/// Used with "now" for live reads of an active session and with the end time when freezing.
pub fn materialize(
    timeline: &Timeline,
    until: DateTime<Utc>,
    config: &SegmentationConfig,
) -> Vec<ActivitySegment> {
    let mut segments = timeline.segments.clone();
    append_span(
        &mut segments,
        timeline.cursor.at,
        until,
        timeline.cursor.locked_in,
        config,
    );
    segments
}
