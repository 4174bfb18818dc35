use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    time,
};

use crate::error::EngineError;

type SessionLock = Arc<AsyncMutex<()>>;

/// One async mutex per session id, created on demand.
///
/// Entries nobody holds or waits on are pruned on the next acquire.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, SessionLock>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        session_id: &str,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<()>, EngineError> {
        let lock = {
            let mut locks = self.map();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };

        time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| EngineError::ConcurrentModification {
                session_id: session_id.to_string(),
            })
    }

    pub fn tracked(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, SessionLock>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
