mod types;

pub use types::{focus_rate, SessionMetrics};

use chrono::{DateTime, Duration, Utc};

use crate::models::{ActivitySegment, Session, SessionState};
use crate::segmentation::{materialize, SegmentationConfig};

/// Totals are summed at full precision and rounded down to whole seconds once, so sub-second
/// segments still add up.
pub fn compute(segments: &[ActivitySegment]) -> SessionMetrics {
    let (total, locked_in) = segments.iter().fold(
        (Duration::zero(), Duration::zero()),
        |(total, locked), segment| {
            let span = segment.duration();
            if segment.locked_in {
                (total + span, locked + span)
            } else {
                (total + span, locked)
            }
        },
    );
    SessionMetrics::from_totals(whole_seconds(total), whole_seconds(locked_in))
}

fn whole_seconds(span: Duration) -> u64 {
    u64::try_from(span.num_seconds()).unwrap_or(0)
}

/// Segments as a reader should see them: the frozen list for ended sessions, the list plus the
/// open tail up to `now` for active ones.
pub fn segments_at(
    session: &Session,
    now: DateTime<Utc>,
    config: &SegmentationConfig,
) -> Vec<ActivitySegment> {
    match session.timeline() {
        Some(timeline) => materialize(&timeline, now, config),
        None => session.segments.clone(),
    }
}

/// Live metrics for active sessions; the stored values for ended ones.
pub fn for_session(
    session: &Session,
    now: DateTime<Utc>,
    config: &SegmentationConfig,
) -> SessionMetrics {
    match &session.state {
        SessionState::Active { .. } => compute(&segments_at(session, now, config)),
        SessionState::Ended { metrics, .. } => *metrics,
    }
}

/// Close the open tail at `ended_at` and freeze the metrics. Ended sessions are returned as-is.
pub fn freeze(
    mut session: Session,
    ended_at: DateTime<Utc>,
    config: &SegmentationConfig,
) -> Session {
    let Some(timeline) = session.timeline() else {
        return session;
    };

    // A client clock running ahead can leave the cursor past "now".
    let ended_at = ended_at.max(timeline.cursor.at);
    let segments = materialize(&timeline, ended_at, config);
    let metrics = compute(&segments);

    session.segments = segments;
    session.state = SessionState::Ended { ended_at, metrics };
    session.updated_at = ended_at;
    session
}
