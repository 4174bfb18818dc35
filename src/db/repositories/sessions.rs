use anyhow::{anyhow, bail, Result};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use crate::aggregation::TimeRange;
use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_optional_datetime, to_i64, to_u64},
    repositories::segments::{read_segments, write_segments},
};
use crate::metrics::SessionMetrics;
use crate::models::{Cursor, Session, SessionState};

const SESSION_COLUMNS: &str = "id, user_id, title, started_at, status, cursor_at, cursor_locked_in, \
     ended_at, total_session_seconds, locked_in_seconds, focus_rate, is_posted, created_at, updated_at";

/// The status-dependent columns; the ones that don't apply to a state are NULL.
struct StateColumns {
    cursor_at: Option<String>,
    cursor_locked_in: Option<bool>,
    ended_at: Option<String>,
    total_session_seconds: Option<i64>,
    locked_in_seconds: Option<i64>,
    focus_rate: Option<f64>,
}

impl StateColumns {
    fn from_state(state: &SessionState) -> Result<Self> {
        Ok(match state {
            SessionState::Active { cursor } => Self {
                cursor_at: Some(format_datetime(&cursor.at)),
                cursor_locked_in: Some(cursor.locked_in),
                ended_at: None,
                total_session_seconds: None,
                locked_in_seconds: None,
                focus_rate: None,
            },
            SessionState::Ended { ended_at, metrics } => Self {
                cursor_at: None,
                cursor_locked_in: None,
                ended_at: Some(format_datetime(ended_at)),
                total_session_seconds: Some(to_i64(metrics.total_session_seconds)?),
                locked_in_seconds: Some(to_i64(metrics.locked_in_seconds)?),
                focus_rate: Some(metrics.focus_rate),
            },
        })
    }
}

fn row_to_state(row: &Row) -> Result<SessionState> {
    let status: String = row.get("status")?;
    match status.as_str() {
        "Active" => {
            let cursor_at: Option<String> = row.get("cursor_at")?;
            let cursor_at = cursor_at.ok_or_else(|| anyhow!("active session has no cursor_at"))?;
            let locked_in: Option<bool> = row.get("cursor_locked_in")?;
            Ok(SessionState::Active {
                cursor: Cursor {
                    at: parse_datetime(&cursor_at, "cursor_at")?,
                    locked_in: locked_in.unwrap_or(false),
                },
            })
        }
        "Ended" => {
            let ended_at = parse_optional_datetime(row.get("ended_at")?, "ended_at")?
                .ok_or_else(|| anyhow!("ended session has no ended_at"))?;
            let total: Option<i64> = row.get("total_session_seconds")?;
            let locked: Option<i64> = row.get("locked_in_seconds")?;
            Ok(SessionState::Ended {
                ended_at,
                // focus_rate is stored for ad-hoc queries; the totals are authoritative.
                metrics: SessionMetrics::from_totals(
                    to_u64(total.unwrap_or(0), "total_session_seconds")?,
                    to_u64(locked.unwrap_or(0), "locked_in_seconds")?,
                ),
            })
        }
        other => bail!("unknown session status {other}"),
    }
}

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        is_posted: row.get("is_posted")?,
        segments: Vec::new(),
        state: row_to_state(row)?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn query_sessions<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS}
         FROM sessions
         WHERE {filter}
         ORDER BY started_at ASC, id ASC"
    ))?;

    let mut rows = stmt.query(params)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }

    for session in &mut sessions {
        session.segments = read_segments(conn, &session.id)?;
    }
    Ok(sessions)
}

fn range_bounds(range: &TimeRange) -> (Option<String>, Option<String>) {
    (
        range.start.as_ref().map(format_datetime),
        range.end.as_ref().map(format_datetime),
    )
}

impl Database {
    pub async fn create_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.transact("insert session", move |tx| {
            let columns = StateColumns::from_state(&record.state)?;
            tx.execute(
                "INSERT INTO sessions (id, user_id, title, started_at, status, cursor_at, cursor_locked_in,
                    ended_at, total_session_seconds, locked_in_seconds, focus_rate, is_posted, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    record.id,
                    record.user_id,
                    record.title,
                    format_datetime(&record.started_at),
                    record.state.as_str(),
                    columns.cursor_at,
                    columns.cursor_locked_in,
                    columns.ended_at,
                    columns.total_session_seconds,
                    columns.locked_in_seconds,
                    columns.focus_rate,
                    record.is_posted,
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )?;
            write_segments(tx, &record.id, &record.segments)
        })
        .await
    }

    pub async fn load_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut session = conn
                .query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                    params![session_id],
                    |row| Ok(row_to_session(row)),
                )
                .optional()?
                .transpose()?;

            if let Some(session) = session.as_mut() {
                session.segments = read_segments(conn, &session.id)?;
            }
            Ok(session)
        })
        .await
    }

    pub async fn load_sessions_for_user(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        let (start, end) = range_bounds(range);
        self.execute(move |conn| {
            query_sessions(
                conn,
                "user_id = ?1
                   AND (?2 IS NULL OR started_at >= ?2)
                   AND (?3 IS NULL OR started_at < ?3)",
                params![user_id, start, end],
            )
        })
        .await
    }

    pub async fn load_posted_sessions(&self, range: &TimeRange) -> Result<Vec<Session>> {
        let (start, end) = range_bounds(range);
        self.execute(move |conn| {
            query_sessions(
                conn,
                "is_posted = 1
                   AND (?1 IS NULL OR started_at >= ?1)
                   AND (?2 IS NULL OR started_at < ?2)",
                params![start, end],
            )
        })
        .await
    }

    /// Overwrite the whole session row and its segments.
    pub async fn update_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.transact("save session", move |tx| {
            let columns = StateColumns::from_state(&record.state)?;
            let rows_affected = tx.execute(
                "UPDATE sessions
                 SET title = ?1,
                     status = ?2,
                     cursor_at = ?3,
                     cursor_locked_in = ?4,
                     ended_at = ?5,
                     total_session_seconds = ?6,
                     locked_in_seconds = ?7,
                     focus_rate = ?8,
                     is_posted = ?9,
                     updated_at = ?10
                 WHERE id = ?11",
                params![
                    record.title,
                    record.state.as_str(),
                    columns.cursor_at,
                    columns.cursor_locked_in,
                    columns.ended_at,
                    columns.total_session_seconds,
                    columns.locked_in_seconds,
                    columns.focus_rate,
                    record.is_posted,
                    format_datetime(&record.updated_at),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("session {} not found", record.id);
            }

            write_segments(tx, &record.id, &record.segments)
        })
        .await
    }
}
