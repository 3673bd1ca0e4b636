//! Per-visitor state for the page handlers.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::classify::Prediction;
use crate::pages::Page;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "skin_session";

/// State private to one visitor.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Page selected in the sidebar
    pub page: Page,

    /// Result of the most recent successful prediction
    pub last_prediction: Option<Prediction>,
}

type Slot = Arc<Mutex<SessionState>>;

/// In-memory session cache, bounded by count (least recently used goes first)
/// and by idle time.
pub struct SessionStore {
    sessions: Cache<Uuid, Slot>,
}

impl SessionStore {
    pub fn new(capacity: usize, idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity.max(1) as u64)
            .time_to_idle(idle)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(|id, _, cause| {
                tracing::debug!("Dropping session {} ({:?})", id, cause);
            })
            .build();
        Self { sessions }
    }

    /// Resolve a cookie value to a live session id, creating a session when the
    /// value is missing, malformed or unknown. The flag is `true` for new ids.
    pub fn resolve(&self, cookie: Option<&str>) -> (Uuid, bool) {
        if let Some(id) = cookie.and_then(|c| Uuid::parse_str(c).ok()) {
            if self.sessions.get(&id).is_some() {
                return (id, false);
            }
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, Slot::default());
        (id, true)
    }

    /// Run `f` against one session's state. Unknown or expired ids get a fresh
    /// state, stored under the same capacity bound.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let slot = self.sessions.get_with(id, Slot::default);
        let mut state = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    pub fn snapshot(&self, id: Uuid) -> SessionState {
        self.with(id, |state| state.clone())
    }

    /// Live sessions, after pending evictions have been applied.
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
