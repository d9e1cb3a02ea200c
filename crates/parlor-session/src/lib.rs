//! In-memory session store for active calls.
//!
//! Maps the telephony provider's opaque call identifier to mutable
//! per-call state. Creation, lookup, and deletion are idempotent. The
//! store holds no cross-session invariants: each call id is only ever
//! touched by the webhook turn currently processing it, so a plain map
//! with per-session mutexes is sufficient.

use chrono::{Duration, Utc};
use parlor_types::CallSession;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// A handle to one call's session. The mutex serializes a full turn,
/// including its await points; the telephony provider delivers webhooks
/// for a given call strictly in sequence, so contention is not expected.
pub type SessionHandle = Arc<Mutex<CallSession>>;

/// Shared store of active call sessions.
///
/// Uses `std::sync::RwLock` for the map intentionally: all map lock
/// acquisitions are brief HashMap operations (get/insert/remove) that
/// never span `.await` points.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `call_id`, creating it if absent.
    ///
    /// An empty call id (missing webhook field, test harness calls) yields
    /// a fresh ephemeral session that is never stored.
    pub fn get_or_create(&self, call_id: &str) -> SessionHandle {
        if call_id.is_empty() {
            return Arc::new(Mutex::new(CallSession::new("")));
        }

        let map = self.sessions.read().expect("session map poisoned");
        if let Some(existing) = map.get(call_id) {
            return Arc::clone(existing);
        }
        drop(map);

        let mut map = self.sessions.write().expect("session map poisoned");
        // Re-check under the write lock: another request may have inserted
        // between the read and write acquisitions.
        Arc::clone(
            map.entry(call_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(CallSession::new(call_id)))),
        )
    }

    /// Removes the session for `call_id`. No-op if absent or empty.
    pub fn delete(&self, call_id: &str) {
        if call_id.is_empty() {
            return;
        }
        self.sessions
            .write()
            .expect("session map poisoned")
            .remove(call_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes sessions idle for longer than `idle_ttl_seconds` and returns
    /// the evicted call ids. A session whose mutex is currently held (a turn
    /// in flight) is skipped this sweep.
    pub fn evict_idle(&self, idle_ttl_seconds: u64) -> Vec<String> {
        let cutoff = Utc::now() - Duration::seconds(idle_ttl_seconds as i64);
        let mut map = self.sessions.write().expect("session map poisoned");
        let expired: Vec<String> = map
            .iter()
            .filter_map(|(id, handle)| {
                let session = handle.try_lock().ok()?;
                (session.last_activity < cutoff).then(|| id.clone())
            })
            .collect();
        for id in &expired {
            map.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::Stage;

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_call_id() {
        let store = SessionStore::new();
        let first = store.get_or_create("CA1");
        let second = store.get_or_create("CA1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_then_get_yields_a_fresh_session() {
        let store = SessionStore::new();
        {
            let handle = store.get_or_create("CA1");
            let mut session = handle.lock().await;
            session.appointment.name = Some("Ann".to_string());
            session.stage = Stage::Collecting;
        }

        store.delete("CA1");
        let handle = store.get_or_create("CA1");
        let session = handle.lock().await;
        assert_eq!(session.appointment.name, None);
        assert_eq!(session.stage, Stage::Greeting);
    }

    #[test]
    fn delete_of_unknown_or_empty_id_is_a_no_op() {
        let store = SessionStore::new();
        store.delete("CA-missing");
        store.delete("");
        assert!(store.is_empty());
    }

    #[test]
    fn empty_call_id_yields_ephemeral_session() {
        let store = SessionStore::new();
        let first = store.get_or_create("");
        let second = store.get_or_create("");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn evict_idle_removes_only_stale_sessions() {
        let store = SessionStore::new();
        {
            let stale = store.get_or_create("CA-stale");
            let mut session = stale.lock().await;
            session.last_activity = Utc::now() - Duration::seconds(3600);
        }
        store.get_or_create("CA-fresh");

        let evicted = store.evict_idle(1800);
        assert_eq!(evicted, vec!["CA-stale".to_string()]);
        assert_eq!(store.len(), 1);
    }
}
