use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
};
use crate::models::{ActivitySegment, Timeline};
use crate::segmentation::merge::coalesce;
use crate::log_warn;

const ENABLE_LOGS: bool = true;

fn row_to_segment(row: &Row) -> Result<ActivitySegment> {
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;

    Ok(ActivitySegment {
        start: parse_datetime(&start_time, "start_time")?,
        end: parse_datetime(&end_time, "end_time")?,
        locked_in: row.get("locked_in")?,
    })
}

/// Segments of one session in order. Rows that overlap or repeat are repaired on the way out.
pub(crate) fn read_segments(conn: &Connection, session_id: &str) -> Result<Vec<ActivitySegment>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time, locked_in
         FROM segments
         WHERE session_id = ?1
         ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut segments = Vec::new();
    while let Some(row) = rows.next()? {
        segments.push(row_to_segment(row)?);
    }

    let stored = segments.len();
    let segments = coalesce(segments);
    if segments.len() != stored {
        log_warn!(
            "Repaired segments of session {}: {} rows became {}",
            session_id,
            stored,
            segments.len()
        );
    }
    Ok(segments)
}

/// Replace every segment row of a session. Callers run this inside their transaction.
pub(crate) fn write_segments(
    conn: &Connection,
    session_id: &str,
    segments: &[ActivitySegment],
) -> Result<()> {
    conn.execute(
        "DELETE FROM segments WHERE session_id = ?1",
        params![session_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO segments (session_id, seq, start_time, end_time, locked_in)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (seq, segment) in segments.iter().enumerate() {
        stmt.execute(params![
            session_id,
            i64::try_from(seq)?,
            format_datetime(&segment.start),
            format_datetime(&segment.end),
            segment.locked_in,
        ])?;
    }

    Ok(())
}

impl Database {
    /// Store the segments and cursor of an active session in one transaction.
    pub async fn replace_timeline(&self, session_id: &str, timeline: &Timeline) -> Result<()> {
        let session_id = session_id.to_string();
        let timeline = timeline.clone();
        self.transact("save segments", move |tx| {
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM sessions WHERE id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;
            match status.as_deref() {
                None => bail!("session {session_id} not found"),
                Some("Ended") => bail!("session {session_id} has ended; segments are frozen"),
                Some(_) => {}
            }

            tx.execute(
                "UPDATE sessions
                 SET cursor_at = ?1,
                     cursor_locked_in = ?2
                 WHERE id = ?3",
                params![
                    format_datetime(&timeline.cursor.at),
                    timeline.cursor.locked_in,
                    session_id,
                ],
            )?;
            write_segments(tx, &session_id, &timeline.segments)
        })
        .await
    }
}
