use crate::auth::AuthConfig;
use std::sync::Arc;
use std::time::Instant;
use todolist_authz::{AccessDecisionEngine, EngineConfig, InMemoryTodoStore, TodoStore};

/// Application state shared across handlers
pub struct AppState {
    /// Access decision engine over the todo store
    pub engine: Arc<AccessDecisionEngine>,

    /// Bearer token verification settings
    pub auth: AuthConfig,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(engine: AccessDecisionEngine, auth: AuthConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            auth,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// State over a fresh in-memory store
    pub fn in_memory(config: EngineConfig, auth: AuthConfig) -> Self {
        let store: Arc<dyn TodoStore> = Arc::new(InMemoryTodoStore::new());
        Self::new(AccessDecisionEngine::new(config, store), auth)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
