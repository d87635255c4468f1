//! Access decision engine
//!
//! Evaluates a caller's claims against a todo operation and, where the
//! operation targets one item, that item's owner. The caller is always passed
//! in explicitly; the store is injected at construction.
//!
//! ```text
//! CallerIdentity ──► claim checks (decision.rs) ──► TodoStore
//!                                │                      │
//!                                └──► MetricsCollector ◄┘
//! ```

pub mod decision;
pub mod metrics;

pub use decision::{list_access, require_policy, require_scope, ListAccess};
pub use metrics::{EngineMetrics, MetricsCollector, Outcome};

use crate::error::{AuthzError, Result};
use crate::identity::{claims, CallerIdentity};
use crate::store::{Removal, TodoStore};
use crate::types::{NewTodo, Operation, Todo, TodoId};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Items inserted when an empty store is first touched
pub const SAMPLE_TITLES: [&str; 2] = ["Pick up groceries", "Finish invoice report"];

/// Engine configuration
///
/// The first three switches default to the long-standing behaviour of the
/// service, which is inconsistent between operations. Turning them on makes
/// Update and Delete follow the same rules as the other operations.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Update requires `ToDo.Write` instead of `ToDo.Read`
    pub update_requires_write: bool,

    /// Update is rejected unless the caller owns the existing item, and the
    /// existing owner is kept
    pub enforce_update_ownership: bool,

    /// Delete resolves the owner with the name fallback
    pub delete_uses_name_fallback: bool,

    /// Seed sample items, owned by the caller's name, into an empty store
    pub seed_sample_data: bool,

    /// Record decision metrics
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_requires_write: false,
            enforce_update_ownership: false,
            delete_uses_name_fallback: false,
            seed_sample_data: true,
            enable_metrics: true,
        }
    }
}

impl EngineConfig {
    /// Consistent owner resolution and policies across all operations
    pub fn strict() -> Self {
        Self {
            update_requires_write: true,
            enforce_update_ownership: true,
            delete_uses_name_fallback: true,
            ..Self::default()
        }
    }
}

/// Claims-based access decision engine over a [`TodoStore`]
pub struct AccessDecisionEngine {
    store: Arc<dyn TodoStore>,
    metrics: Option<Arc<MetricsCollector>>,
    config: EngineConfig,
}

impl AccessDecisionEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn TodoStore>) -> Self {
        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new()));

        info!(
            update_requires_write = config.update_requires_write,
            enforce_update_ownership = config.enforce_update_ownership,
            delete_uses_name_fallback = config.delete_uses_name_fallback,
            seed_sample_data = config.seed_sample_data,
            "AccessDecisionEngine initialized"
        );

        Self {
            store,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TodoStore> {
        &self.store
    }

    /// Get engine metrics
    pub async fn get_metrics(&self) -> Option<EngineMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    /// List the items the caller may see
    pub async fn list(&self, caller: &CallerIdentity) -> Result<Vec<Todo>> {
        let start = Instant::now();
        let result = self.list_inner(caller).await;
        self.finalize(Operation::List, caller, start, result).await
    }

    /// Read one item owned by the caller
    ///
    /// `Ok(None)` when the id is absent or owned by someone else.
    pub async fn read_one(&self, caller: &CallerIdentity, id: TodoId) -> Result<Option<Todo>> {
        let start = Instant::now();
        let result = self.read_one_inner(caller, id).await;
        self.finalize(Operation::ReadOne, caller, start, result).await
    }

    /// Create an item owned by the caller
    pub async fn create(&self, caller: &CallerIdentity, title: impl Into<String>) -> Result<Todo> {
        let start = Instant::now();
        let result = self.create_inner(caller, title.into()).await;
        self.finalize(Operation::Create, caller, start, result).await
    }

    /// Replace item `id` with `todo`
    pub async fn update(&self, caller: &CallerIdentity, id: TodoId, todo: Todo) -> Result<Todo> {
        let start = Instant::now();
        let result = self.update_inner(caller, id, todo).await;
        self.finalize(Operation::Update, caller, start, result).await
    }

    /// Delete item `id` if the caller owns it
    ///
    /// Deleting an absent id succeeds and returns `None`.
    pub async fn delete(&self, caller: &CallerIdentity, id: TodoId) -> Result<Option<Todo>> {
        let start = Instant::now();
        let result = self.delete_inner(caller, id).await;
        self.finalize(Operation::Delete, caller, start, result).await
    }

    async fn list_inner(&self, caller: &CallerIdentity) -> Result<Vec<Todo>> {
        self.ensure_seeded(caller).await?;

        let access = list_access(caller)?;
        debug!(access = ?access, "List access resolved");

        let todos = self.store.list().await?;
        Ok(todos
            .into_iter()
            .filter(|t| access.permits(&t.owner))
            .collect())
    }

    async fn read_one_inner(&self, caller: &CallerIdentity, id: TodoId) -> Result<Option<Todo>> {
        self.ensure_seeded(caller).await?;
        require_scope(caller, claims::TODO_READ)?;

        let owner = caller.resolved_owner();
        Ok(self
            .store
            .get(id)
            .await?
            .filter(|t| t.is_owned_by(Some(owner))))
    }

    async fn create_inner(&self, caller: &CallerIdentity, title: String) -> Result<Todo> {
        self.ensure_seeded(caller).await?;
        require_policy(caller, claims::TODO_WRITE)?;

        let todo = self
            .store
            .insert(NewTodo::new(caller.resolved_owner(), title))
            .await?;

        info!(id = todo.id, owner = %todo.owner, "Todo created");
        Ok(todo)
    }

    async fn update_inner(
        &self,
        caller: &CallerIdentity,
        id: TodoId,
        mut todo: Todo,
    ) -> Result<Todo> {
        self.ensure_seeded(caller).await?;

        let policy = if self.config.update_requires_write {
            claims::TODO_WRITE
        } else {
            claims::TODO_READ
        };
        require_policy(caller, policy)?;

        if id != todo.id {
            return Err(AuthzError::NotFound(format!(
                "path id {} does not match body id {}",
                id, todo.id
            )));
        }

        if self.config.enforce_update_ownership {
            let existing = self
                .store
                .get(id)
                .await?
                .ok_or_else(|| AuthzError::NotFound(format!("todo {}", id)))?;

            if !existing.is_owned_by(Some(caller.resolved_owner())) {
                return Err(AuthzError::Unauthorized(format!(
                    "todo {} is owned by another identity",
                    id
                )));
            }
            todo.owner = existing.owner;
        }

        match self.store.replace(id, todo.clone()).await? {
            Some(previous) => {
                if previous.owner != todo.owner {
                    warn!(
                        id,
                        from = %previous.owner,
                        to = %todo.owner,
                        "Todo owner replaced by update"
                    );
                }
                info!(id, "Todo updated");
                Ok(todo)
            }
            None => Err(AuthzError::NotFound(format!("todo {}", id))),
        }
    }

    async fn delete_inner(&self, caller: &CallerIdentity, id: TodoId) -> Result<Option<Todo>> {
        self.ensure_seeded(caller).await?;
        require_policy(caller, claims::TODO_WRITE)?;

        let owner = if self.config.delete_uses_name_fallback {
            Some(caller.resolved_owner())
        } else {
            caller.object_id_owner()
        };

        match self
            .store
            .remove_if(id, &|t: &Todo| t.is_owned_by(owner))
            .await?
        {
            Removal::Removed(todo) => {
                info!(id, "Todo deleted");
                Ok(Some(todo))
            }
            Removal::Kept(_) => Err(AuthzError::Unauthorized(format!(
                "todo {} is owned by another identity",
                id
            ))),
            Removal::Missing => {
                debug!(id, "Delete of absent todo ignored");
                Ok(None)
            }
        }
    }

    async fn ensure_seeded(&self, caller: &CallerIdentity) -> Result<()> {
        if !self.config.seed_sample_data {
            return Ok(());
        }

        let samples = SAMPLE_TITLES
            .iter()
            .map(|title| NewTodo::new(caller.name.clone(), *title))
            .collect();

        if self.store.seed_if_empty(samples).await? {
            info!(owner = %caller.name, "Seeded empty store with sample todos");
        }
        Ok(())
    }

    async fn finalize<T>(
        &self,
        operation: Operation,
        caller: &CallerIdentity,
        start: Instant,
        result: Result<T>,
    ) -> Result<T> {
        let outcome = match &result {
            Ok(_) => Outcome::Allowed,
            Err(AuthzError::Forbidden(_)) => Outcome::Forbidden,
            Err(AuthzError::Unauthorized(_)) => Outcome::Unauthorized,
            Err(AuthzError::NotFound(_)) => Outcome::NotFound,
            Err(AuthzError::Store(_)) => Outcome::Error,
        };

        match &result {
            Ok(_) => debug!(
                operation = %operation,
                caller = %caller.resolved_owner(),
                "Decision: ALLOW"
            ),
            Err(e) => info!(
                operation = %operation,
                caller = %caller.resolved_owner(),
                outcome = outcome.as_str(),
                error = %e,
                "Decision: DENY"
            ),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record(operation, outcome, start.elapsed()).await;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTodoStore;

    fn engine_with(todos: Vec<Todo>) -> AccessDecisionEngine {
        let config = EngineConfig {
            seed_sample_data: false,
            ..EngineConfig::default()
        };
        AccessDecisionEngine::new(config, Arc::new(InMemoryTodoStore::with_todos(todos)))
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let engine = AccessDecisionEngine::new(
            EngineConfig::default(),
            Arc::new(InMemoryTodoStore::new()),
        );
        assert!(engine.metrics.is_some());
        assert!(engine.config().seed_sample_data);
        assert!(!engine.config().update_requires_write);
    }

    #[tokio::test]
    async fn test_read_one_owner_scenario() {
        let engine = engine_with(vec![Todo::new(1, "alice", "A")]);

        let alice = CallerIdentity::new("Alice")
            .with_object_id("alice")
            .with_scope(claims::TODO_READ);
        let bob = CallerIdentity::new("Bob")
            .with_object_id("bob")
            .with_scope(claims::TODO_READ);

        assert_eq!(
            engine.read_one(&alice, 1).await.unwrap(),
            Some(Todo::new(1, "alice", "A"))
        );
        assert_eq!(engine.read_one(&bob, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_one_without_scope_claim_is_forbidden() {
        let engine = engine_with(vec![Todo::new(1, "alice", "A")]);
        let caller = CallerIdentity::new("alice").with_role(claims::TODO_READ_ALL);

        let err = engine.read_one(&caller, 1).await.unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_metrics_track_outcomes() {
        let engine = engine_with(vec![]);
        let nobody = CallerIdentity::new("nobody");

        let _ = engine.list(&nobody).await;
        let metrics = engine.get_metrics().await.unwrap();

        assert_eq!(metrics.total_decisions, 1);
        assert_eq!(metrics.count(Operation::List, Outcome::Forbidden), 1);
    }
}
