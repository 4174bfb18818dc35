//! Store collaborator contract.
//!
//! The engine never writes durable state itself: the tracker reads through this trait, runs the
//! pure core, and hands the results back for persistence. `MemoryStore` backs tests and the
//! replay tool; `crate::db::Database` is the SQLite implementation.

mod memory;

pub use memory::MemoryStore;

use anyhow::Result;

use crate::aggregation::TimeRange;
use crate::models::{DomainOverride, MasterDomainEntry, Session, Timeline};

#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    async fn get_master_list(&self) -> Result<Vec<MasterDomainEntry>>;

    async fn upsert_master_entry(&self, entry: &MasterDomainEntry) -> Result<()>;

    async fn get_overrides(&self, user_id: &str) -> Result<Vec<DomainOverride>>;

    /// At most one override per (user, domain); a second write replaces the first.
    async fn upsert_override(&self, entry: &DomainOverride) -> Result<()>;

    /// Returns whether an override existed.
    async fn delete_override(&self, user_id: &str, domain: &str) -> Result<bool>;

    async fn insert_session(&self, session: &Session) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// One user's sessions whose start falls in `range`, oldest first.
    async fn get_sessions_in_range(&self, user_id: &str, range: &TimeRange)
        -> Result<Vec<Session>>;

    /// Posted sessions of every user whose start falls in `range`, oldest first.
    async fn get_posted_sessions_in_range(&self, range: &TimeRange) -> Result<Vec<Session>>;

    /// Replace the segments and cursor of an active session.
    async fn save_segments(&self, session_id: &str, timeline: &Timeline) -> Result<()>;

    /// Replace the whole session record.
    async fn save_session(&self, session: &Session) -> Result<()>;
}
