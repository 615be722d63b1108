// Live sessions keyed by id

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as TokioMutex;
use tracing::info;
use uuid::Uuid;

use super::SessionState;
use crate::downloader::ProgressTracker;

/// One user's session. `state` is held for the whole of an action, so
/// actions on the same session run one at a time; `progress` stays readable
/// while a download holds `state`.
pub struct SessionHandle {
    pub state: TokioMutex<SessionState>,
    pub progress: ProgressTracker,
    last_seen: Mutex<Instant>,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            state: TokioMutex::new(SessionState::new()),
            progress: ProgressTracker::new(),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut seen) = self.last_seen.lock() {
            *seen = Instant::now();
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        self.last_seen
            .lock()
            .map(|seen| now.saturating_duration_since(*seen))
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Arc<SessionHandle>>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Start an empty session and return its id
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(id.clone(), Arc::new(SessionHandle::new()));
        }
        info!(session = %id, "Session started");
        id
    }

    /// Look a session up and mark it as active
    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        let handle = self.sessions.lock().ok()?.get(id).cloned()?;
        handle.touch();
        Some(handle)
    }

    /// End a session. Its temp files go once the last in-flight action
    /// releases the handle.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .lock()
            .map(|mut sessions| sessions.remove(id).is_some())
            .unwrap_or(false);
        if removed {
            info!(session = %id, "Session ended");
        }
        removed
    }

    /// End every session idle for longer than the TTL
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, handle| handle.idle_for(now) <= self.ttl);
        let swept = before - sessions.len();
        if swept > 0 {
            info!(swept, remaining = sessions.len(), "Expired idle sessions");
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
