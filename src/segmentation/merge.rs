use chrono::{DateTime, Utc};

use crate::models::ActivitySegment;
use crate::segmentation::config::SegmentationConfig;

/// Append `[start, end)` with the given flag, extending the last segment when it ends at `start`
/// with the same flag. Empty or inverted intervals are dropped.
pub fn push_interval(
    segments: &mut Vec<ActivitySegment>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    locked_in: bool,
) {
    if end <= start {
        return;
    }

    if let Some(last) = segments.last_mut() {
        if last.locked_in == locked_in && last.end == start {
            last.end = end;
            return;
        }
    }

    segments.push(ActivitySegment {
        start,
        end,
        locked_in,
    });
}

/// Like `push_interval`, but splits off the part of the span beyond the idle threshold as
/// not-locked-in time.
///
/// Only the excess becomes idle: the first `threshold` of a long gap keeps the earlier flag. An
/// open tail therefore never loses locked-in time as `end` moves forward, and a live reading
/// never drops when the gap crosses the threshold.
pub fn append_span(
    segments: &mut Vec<ActivitySegment>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    locked_in: bool,
    config: &SegmentationConfig,
) {
    if end <= start {
        return;
    }

    let threshold = config.idle_threshold();
    if end - start > threshold {
        let idle_from = start + threshold;
        push_interval(segments, start, idle_from, locked_in);
        push_interval(segments, idle_from, end, false);
    } else {
        push_interval(segments, start, end, locked_in);
    }
}

/// Re-establish the sequence invariants on segments from an untrusted source: sorted by start,
/// overlaps trimmed, empty segments dropped, equal neighbours merged.
pub fn coalesce(mut segments: Vec<ActivitySegment>) -> Vec<ActivitySegment> {
    segments.sort_by_key(|segment| segment.start);

    let mut result: Vec<ActivitySegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        let start = match result.last() {
            Some(last) if last.end > segment.start => last.end,
            _ => segment.start,
        };
        push_interval(&mut result, start, segment.end, segment.locked_in);
    }
    result
}
