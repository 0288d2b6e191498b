// orchestrator-rs/src/session.rs
// Per-session state keyed by session identifier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use shared_types_rs::{ConversationContext, ExecutionMode};

/// Everything one session carries between turns.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub context: ConversationContext,
    pub mode: ExecutionMode,
    /// Query that was answered with a clarifying question and awaits detail.
    pub pending_clarification: Option<String>,
    pub last_tool: Option<String>,
    pub turns: u64,
    last_active: Instant,
}

impl SessionState {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            context: ConversationContext::default(),
            mode,
            pending_clarification: None,
            last_tool: None,
            turns: 0,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// Session registry. Turns of one session are serialized by its mutex;
/// different sessions never share state.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    default_mode: ExecutionMode,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(default_mode: ExecutionMode, idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            default_mode,
            idle_ttl,
        }
    }

    pub fn default_mode(&self) -> ExecutionMode {
        self.default_mode
    }

    /// Handle for `session_id`, created on first use.
    pub fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                log::debug!("Opening session {}", session_id);
                Arc::new(Mutex::new(SessionState::new(self.default_mode)))
            })
            .value()
            .clone()
    }

    pub async fn set_mode(&self, session_id: &str, mode: ExecutionMode) {
        let session = self.session(session_id);
        let mut state = session.lock().await;
        if state.mode != mode {
            log::info!("Session {} switched to {} mode", session_id, mode);
        }
        state.mode = mode;
    }

    pub async fn mode_of(&self, session_id: &str) -> ExecutionMode {
        match self.sessions.get(session_id).map(|entry| entry.value().clone()) {
            Some(session) => session.lock().await.mode,
            None => self.default_mode,
        }
    }

    /// Drop a session and its context. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Remove sessions idle for longer than the ttl. Sessions with a turn in
    /// flight are never evicted.
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, session| match session.try_lock() {
            Ok(state) => state.idle_for() < ttl,
            Err(_) => true,
        });
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            log::info!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
