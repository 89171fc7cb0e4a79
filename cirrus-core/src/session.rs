//! Conversation-scoped session state.
//!
//! A session tracks which account tool calls target. State is mutated only by
//! the `switch_account` tool (through the broker) or at session creation,
//! where it defaults to the registry's default account.
//!
//! Locking model: the outer map takes a short, non-async lock only to find or
//! insert a session handle; each session carries its own `tokio::sync::RwLock`
//! so `set_active` and concurrent reads linearize per session without a
//! global lock across sessions.

use chrono::{DateTime, Utc};
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default idle lifetime before a session is eligible for purging.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Mutable state of one conversation session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Registry id of the account invocations currently target.
    pub active_account_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

type SessionHandle = Arc<RwLock<SessionState>>;

/// Tracks active-account state per session id.
///
/// Sessions are created lazily on first use, seeded with the default account,
/// and destroyed when idle longer than the TTL.
pub struct SessionManager {
    sessions: SyncRwLock<HashMap<String, SessionHandle>>,
    default_account: String,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(default_account: impl Into<String>, ttl: Duration) -> Self {
        SessionManager {
            sessions: SyncRwLock::new(HashMap::new()),
            default_account: default_account.into(),
            ttl,
        }
    }

    /// Account new sessions start on.
    pub fn default_account(&self) -> &str {
        &self.default_account
    }

    /// Find or create the handle for a session.
    fn handle(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(session_id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                let now = Utc::now();
                Arc::new(RwLock::new(SessionState {
                    active_account_id: self.default_account.clone(),
                    created_at: now,
                    last_activity_at: now,
                }))
            })
            .clone()
    }

    /// Resolve the session's active account id, touching its activity time.
    pub async fn active_account(&self, session_id: &str) -> String {
        let handle = self.handle(session_id);
        let mut state = handle.write().await;
        state.last_activity_at = Utc::now();
        state.active_account_id.clone()
    }

    /// Switch the session's active account, returning the previous one.
    ///
    /// Callers must validate the account against the registry first; this
    /// method only records the switch.
    pub async fn set_active(&self, session_id: &str, account_id: &str) -> String {
        let handle = self.handle(session_id);
        let mut state = handle.write().await;
        let previous = std::mem::replace(&mut state.active_account_id, account_id.to_string());
        state.last_activity_at = Utc::now();
        previous
    }

    /// Snapshot a session's state, if it exists.
    pub async fn get(&self, session_id: &str) -> Option<SessionState> {
        let handle = self.sessions.read().get(session_id)?.clone();
        let state = handle.read().await;
        Some(state.clone())
    }

    /// Drop sessions idle longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_read() {
            // A held write lock means the session is mid-invocation; keep it.
            Err(_) => true,
            Ok(state) => state.last_activity_at > cutoff,
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
