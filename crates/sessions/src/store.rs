//! Concurrent session store with per-user serialization and TTL expiry.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    dashmap::DashMap,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

use crate::session::Session;

/// Sessions idle for longer than this are swept.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-user conversational state, keyed by the platform user id.
///
/// Two disciplines keep same-user traffic linearized:
/// - every single map operation is atomic through the `DashMap` entry API;
/// - callers that read, await, and write back hold the user guard from
///   [`SessionStore::guard`] across the whole sequence. Guards are per user,
///   so distinct users never contend.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the per-user guard serializing read-modify-write sequences.
    pub async fn guard(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Existing session with last-activity refreshed, or a fresh default.
    /// Never absent.
    pub fn get(&self, user_id: &str) -> Session {
        let mut entry = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id));
        entry.last_activity = Instant::now();
        entry.clone()
    }

    /// Write back a working copy, refreshing last-activity.
    pub fn update(&self, user_id: &str, mut session: Session) {
        session.last_activity = Instant::now();
        self.sessions.insert(user_id.to_string(), session);
    }

    /// Replace with a fresh default session (`/reset`).
    pub fn clear(&self, user_id: &str) {
        self.sessions.insert(user_id.to_string(), Session::new(user_id));
    }

    /// Hard delete (unfollow). Returns whether a session existed.
    pub fn remove(&self, user_id: &str) -> bool {
        let existed = self.sessions.remove(user_id).is_some();
        self.locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
        existed
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every session idle for longer than `ttl`; returns how many.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        self.sweep_at(ttl, Instant::now())
    }

    fn sweep_at(&self, ttl: Duration, now: Instant) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = now.duration_since(session.last_activity) <= ttl;
            if !keep {
                removed += 1;
            }
            keep
        });
        // Locks for users with no session and no holder go with them.
        self.locks.retain(|user_id, lock| {
            self.sessions.contains_key(user_id) || Arc::strong_count(lock) > 1
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::session::SessionState};

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn get_creates_a_default_session() {
        let store = SessionStore::new();
        let session = store.get("U1");
        assert_eq!(session.state, SessionState::Idle);
        assert!(store.contains("U1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_replaces_the_stored_value() {
        let store = SessionStore::new();
        let mut session = store.get("U1");
        session.state = SessionState::Researching;
        session.current_context = "quantum error correction".into();
        store.update("U1", session);

        let fetched = store.get("U1");
        assert_eq!(fetched.state, SessionState::Researching);
        assert_eq!(fetched.current_context, "quantum error correction");
    }

    #[test]
    fn clear_reinitializes_in_place() {
        let store = SessionStore::new();
        let mut session = store.get("U1");
        session.state = SessionState::Researching;
        session.record_query("old query");
        store.update("U1", session);

        store.clear("U1");
        let fresh = store.get("U1");
        assert_eq!(fresh.state, SessionState::Idle);
        assert!(fresh.history.is_empty());
    }

    #[test]
    fn remove_deletes_the_session() {
        let store = SessionStore::new();
        store.get("U1");
        assert!(store.remove("U1"));
        assert!(!store.contains("U1"));
        assert!(!store.remove("U1"));
    }

    #[test]
    fn sweep_removes_only_expired_sessions() {
        let store = SessionStore::new();
        store.get("stale");
        store.get("fresh");

        // "stale" is a whole TTL plus an hour old by the time we sweep;
        // "fresh" was touched a minute before.
        let now = Instant::now() + TTL + Duration::from_secs(3600);
        {
            let mut entry = store.sessions.get_mut("fresh").unwrap();
            entry.last_activity = now - Duration::from_secs(60);
        }

        let removed = store.sweep_at(TTL, now);
        assert_eq!(removed, 1);
        assert!(!store.contains("stale"));
        assert!(store.contains("fresh"));
    }

    #[test]
    fn sweep_keeps_a_session_at_the_boundary() {
        let store = SessionStore::new();
        store.get("edge");
        let now = Instant::now() + TTL;
        // Touched exactly TTL ago: not yet expired.
        assert_eq!(store.sweep_at(TTL, now), 0);
        assert!(store.contains("edge"));
    }

    #[tokio::test]
    async fn guard_serializes_one_user() {
        let store = Arc::new(SessionStore::new());
        let guard = store.guard("U1").await;

        let second = tokio::time::timeout(Duration::from_millis(50), store.guard("U1"));
        assert!(second.await.is_err(), "same-user guard should block");

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), store.guard("U1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn distinct_users_do_not_contend() {
        let store = Arc::new(SessionStore::new());
        let _held = store.guard("U1").await;

        let other = tokio::time::timeout(Duration::from_millis(50), store.guard("U2")).await;
        assert!(other.is_ok(), "distinct users must not share a lock");
    }

    #[tokio::test]
    async fn sweep_drops_idle_lock_entries() {
        let store = SessionStore::new();
        drop(store.guard("U1").await);
        store.get("U1");

        let now = Instant::now() + TTL + Duration::from_secs(1);
        assert_eq!(store.sweep_at(TTL, now), 1);
        assert!(store.locks.is_empty());
    }
}
