//! Session store with per-session mutual exclusion.
//!
//! Every message runs load -> mutate -> save under the lock for its session
//! id, so two messages for the same session never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parley_core::error::ParleyError;
use parley_core::ChatSession;
use parley_storage::SessionRepository;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async locks keyed by external session id.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Drop locks nobody holds or waits on.
            locks.retain(|id, l| id == session_id || Arc::strong_count(l) > 1);
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked session locks.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session persistence plus the lock table.
pub struct SessionStore {
    repo: SessionRepository,
    locks: SessionLocks,
}

impl SessionStore {
    pub fn new(repo: SessionRepository) -> Self {
        Self {
            repo,
            locks: SessionLocks::new(),
        }
    }

    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(session_id).await
    }

    /// Fetch the session or create an idle one.
    pub fn get_or_create(&self, session_id: &str) -> Result<ChatSession, ParleyError> {
        self.repo.get_or_create(session_id)
    }

    pub fn save(&self, session: &mut ChatSession) -> Result<(), ParleyError> {
        self.repo.update(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{FlowAction, StepId};
    use parley_storage::Database;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_session_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let guard = locks.acquire("a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks = SessionLocks::new();
        drop(locks.acquire("a").await);
        drop(locks.acquire("b").await);
        drop(locks.acquire("c").await);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let db = Arc::new(Database::in_memory().unwrap());
        let store = SessionStore::new(SessionRepository::new(db));

        let _guard = store.lock("s-9").await;
        let mut session = store.get_or_create("s-9").unwrap();
        assert!(session.is_idle());

        session.action = Some(FlowAction::UpdatePhone);
        session.step = Some(StepId::ContractId);
        store.save(&mut session).unwrap();

        let again = store.get_or_create("s-9").unwrap();
        assert_eq!(again.in_step(), Some((FlowAction::UpdatePhone, StepId::ContractId)));
        assert_eq!(again.id, session.id);
    }
}
