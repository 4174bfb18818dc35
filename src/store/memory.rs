use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;

use crate::aggregation::TimeRange;
use crate::models::{DomainLabel, DomainOverride, MasterDomainEntry, Session, Timeline};
use crate::store::Store;

#[derive(Default)]
struct MemoryData {
    master: BTreeMap<String, DomainLabel>,
    overrides: BTreeMap<(String, String), DomainLabel>,
    sessions: HashMap<String, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut sessions: Vec<Session>) -> Vec<Session> {
        sessions.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }
}

impl Store for MemoryStore {
    async fn get_master_list(&self) -> Result<Vec<MasterDomainEntry>> {
        let data = self.data.read().await;
        Ok(data
            .master
            .iter()
            .map(|(domain, classification)| MasterDomainEntry {
                domain: domain.clone(),
                classification: *classification,
            })
            .collect())
    }

    async fn upsert_master_entry(&self, entry: &MasterDomainEntry) -> Result<()> {
        let mut data = self.data.write().await;
        data.master.insert(entry.domain.clone(), entry.classification);
        Ok(())
    }

    async fn get_overrides(&self, user_id: &str) -> Result<Vec<DomainOverride>> {
        let data = self.data.read().await;
        Ok(data
            .overrides
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|((owner, domain), classification)| DomainOverride {
                user_id: owner.clone(),
                domain: domain.clone(),
                classification: *classification,
            })
            .collect())
    }

    async fn upsert_override(&self, entry: &DomainOverride) -> Result<()> {
        let mut data = self.data.write().await;
        data.overrides.insert(
            (entry.user_id.clone(), entry.domain.clone()),
            entry.classification,
        );
        Ok(())
    }

    async fn delete_override(&self, user_id: &str, domain: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        Ok(data
            .overrides
            .remove(&(user_id.to_string(), domain.to_string()))
            .is_some())
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        let mut data = self.data.write().await;
        if data.sessions.contains_key(&session.id) {
            return Err(anyhow!("session {} already exists", session.id));
        }
        data.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let data = self.data.read().await;
        Ok(data.sessions.get(session_id).cloned())
    }

    async fn get_sessions_in_range(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<Vec<Session>> {
        let data = self.data.read().await;
        Ok(Self::sorted(
            data.sessions
                .values()
                .filter(|session| session.user_id == user_id && range.contains(session.started_at))
                .cloned()
                .collect(),
        ))
    }

    async fn get_posted_sessions_in_range(&self, range: &TimeRange) -> Result<Vec<Session>> {
        let data = self.data.read().await;
        Ok(Self::sorted(
            data.sessions
                .values()
                .filter(|session| session.is_posted && range.contains(session.started_at))
                .cloned()
                .collect(),
        ))
    }

    async fn save_segments(&self, session_id: &str, timeline: &Timeline) -> Result<()> {
        let mut data = self.data.write().await;
        let session = data
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("session {session_id} not found"))?;
        if session.is_ended() {
            return Err(anyhow!("session {session_id} has ended; segments are frozen"));
        }
        let updated_at = session.updated_at;
        session.apply_timeline(timeline.clone(), updated_at);
        Ok(())
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let mut data = self.data.write().await;
        match data.sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(anyhow!("session {} not found", session.id)),
        }
    }
}
