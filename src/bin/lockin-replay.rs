//! Replays a recorded ping log through the engine and prints the resulting session detail.
//!
//! Usage: `lockin-replay <log.json>`, where the log looks like
//! `{ "userId", "startedAt", "endedAt"?, "masterList", "overrides", "pings": [{ "domain", "timestamp" }] }`.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;

use lockin_lib::{
    init_logging, ActivityPing, DomainOverride, EngineSettings, ManualClock, MasterDomainEntry,
    MemoryStore, SessionTracker, Store,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayLog {
    user_id: String,
    started_at: DateTime<Utc>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    master_list: Vec<MasterDomainEntry>,
    #[serde(default)]
    overrides: Vec<DomainOverride>,
    #[serde(default)]
    pings: Vec<RecordedPing>,
}

#[derive(Debug, Deserialize)]
struct RecordedPing {
    #[serde(alias = "url")]
    domain: String,
    timestamp: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: lockin-replay <log.json>");
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let log: ReplayLog = serde_json::from_str(&contents)
        .with_context(|| format!("invalid replay log {}", path.display()))?;

    let store = Arc::new(MemoryStore::new());
    for entry in &log.master_list {
        store.upsert_master_entry(entry).await?;
    }
    for entry in log.overrides.iter().filter(|entry| entry.user_id == log.user_id) {
        store.upsert_override(entry).await?;
    }

    let clock = Arc::new(ManualClock::new(log.started_at));
    let tracker = SessionTracker::new(
        store,
        Arc::clone(&clock),
        EngineSettings::default().with_env_overrides(),
    );

    let session = tracker.start_session(&log.user_id, None).await?;
    let pings: Vec<ActivityPing> = log
        .pings
        .iter()
        .map(|ping| ActivityPing::new(&session.id, &ping.domain, ping.timestamp))
        .collect();
    info!("Replaying {} pings from {}", pings.len(), path.display());
    // Replay as of the last recorded ping.
    if let Some(last) = pings.iter().map(|ping| ping.timestamp).max() {
        clock.set(last.max(log.started_at));
    }
    tracker
        .upload_activity(&log.user_id, &session.id, &pings)
        .await?;

    let detail = match log.ended_at {
        Some(ended_at) => {
            clock.set(ended_at);
            tracker.end_session(&log.user_id, &session.id).await?
        }
        None => tracker.session_detail(&log.user_id, &session.id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}
