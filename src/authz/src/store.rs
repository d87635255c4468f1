//! Todo storage

use crate::error::Result;
use crate::types::{NewTodo, Todo, TodoId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of [`TodoStore::remove_if`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Item existed, the predicate held and it was removed
    Removed(Todo),
    /// Item existed but the predicate rejected it; nothing changed
    Kept(Todo),
    /// No item with that id
    Missing,
}

/// Predicate evaluated inside the store's critical section
pub type TodoPredicate<'a> = &'a (dyn Fn(&Todo) -> bool + Send + Sync);

/// Todo store trait
///
/// Each method is one critical section: multi-step work (id assignment,
/// check-then-replace, check-then-delete) must not interleave with writers.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Get an item by id
    async fn get(&self, id: TodoId) -> Result<Option<Todo>>;

    /// List all items, ordered by id
    async fn list(&self) -> Result<Vec<Todo>>;

    /// Insert a new item with id = max + 1 (1 when empty)
    async fn insert(&self, todo: NewTodo) -> Result<Todo>;

    /// Replace an existing item, returning the previous one
    ///
    /// Returns `None` and leaves the store untouched when `id` is absent.
    async fn replace(&self, id: TodoId, todo: Todo) -> Result<Option<Todo>>;

    /// Remove an item if `predicate` accepts it
    async fn remove_if(&self, id: TodoId, predicate: TodoPredicate<'_>) -> Result<Removal>;

    /// Insert `items` in order if the store is empty; returns whether it seeded
    async fn seed_if_empty(&self, items: Vec<NewTodo>) -> Result<bool>;

    /// Number of stored items
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// In-memory todo store
pub struct InMemoryTodoStore {
    todos: Arc<RwLock<BTreeMap<TodoId, Todo>>>,
}

impl InMemoryTodoStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            todos: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Create a store pre-populated with `todos`
    pub fn with_todos(todos: impl IntoIterator<Item = Todo>) -> Self {
        let map = todos.into_iter().map(|t| (t.id, t)).collect();
        Self {
            todos: Arc::new(RwLock::new(map)),
        }
    }

    fn next_id(todos: &BTreeMap<TodoId, Todo>) -> TodoId {
        todos.keys().next_back().map_or(1, |max| max + 1)
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn get(&self, id: TodoId) -> Result<Option<Todo>> {
        let todos = self.todos.read().await;
        Ok(todos.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Todo>> {
        let todos = self.todos.read().await;
        Ok(todos.values().cloned().collect())
    }

    async fn insert(&self, todo: NewTodo) -> Result<Todo> {
        let mut todos = self.todos.write().await;
        let id = Self::next_id(&todos);
        let created = Todo::new(id, todo.owner, todo.title);
        todos.insert(id, created.clone());
        Ok(created)
    }

    async fn replace(&self, id: TodoId, todo: Todo) -> Result<Option<Todo>> {
        let mut todos = self.todos.write().await;
        match todos.get_mut(&id) {
            Some(existing) => Ok(Some(std::mem::replace(existing, todo))),
            None => Ok(None),
        }
    }

    async fn remove_if(&self, id: TodoId, predicate: TodoPredicate<'_>) -> Result<Removal> {
        let mut todos = self.todos.write().await;
        let Some(existing) = todos.get(&id) else {
            return Ok(Removal::Missing);
        };

        if !predicate(existing) {
            return Ok(Removal::Kept(existing.clone()));
        }

        Ok(todos
            .remove(&id)
            .map(Removal::Removed)
            .unwrap_or(Removal::Missing))
    }

    async fn seed_if_empty(&self, items: Vec<NewTodo>) -> Result<bool> {
        if !self.todos.read().await.is_empty() {
            return Ok(false);
        }

        // Re-checked: another caller may have seeded between the two guards
        let mut todos = self.todos.write().await;
        if !todos.is_empty() {
            return Ok(false);
        }

        for item in items {
            let id = Self::next_id(&todos);
            todos.insert(id, Todo::new(id, item.owner, item.title));
        }
        Ok(true)
    }

    async fn len(&self) -> Result<usize> {
        let todos = self.todos.read().await;
        Ok(todos.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_on_empty_store_starts_at_one() {
        let store = InMemoryTodoStore::new();
        let todo = store.insert(NewTodo::new("alice", "First")).await.unwrap();
        assert_eq!(todo.id, 1);
    }

    #[tokio::test]
    async fn test_insert_uses_max_id_not_count() {
        let store = InMemoryTodoStore::with_todos([
            Todo::new(3, "alice", "A"),
            Todo::new(10, "bob", "B"),
        ]);

        let todo = store.insert(NewTodo::new("carol", "C")).await.unwrap();
        assert_eq!(todo.id, 11);
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_missing_is_noop() {
        let store = InMemoryTodoStore::new();
        let previous = store
            .replace(4, Todo::new(4, "alice", "Nope"))
            .await
            .unwrap();

        assert!(previous.is_none());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_if_respects_predicate() {
        let store = InMemoryTodoStore::with_todos([Todo::new(1, "alice", "A")]);

        let kept = store.remove_if(1, &|t: &Todo| t.owner == "bob").await.unwrap();
        assert_eq!(kept, Removal::Kept(Todo::new(1, "alice", "A")));
        assert_eq!(store.len().await.unwrap(), 1);

        let removed = store.remove_if(1, &|t: &Todo| t.owner == "alice").await.unwrap();
        assert_eq!(removed, Removal::Removed(Todo::new(1, "alice", "A")));
        assert!(store.get(1).await.unwrap().is_none());

        let missing = store.remove_if(1, &|_: &Todo| true).await.unwrap();
        assert_eq!(missing, Removal::Missing);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = InMemoryTodoStore::new();
        let seeded = store
            .seed_if_empty(vec![NewTodo::new("alice", "A"), NewTodo::new("alice", "B")])
            .await
            .unwrap();
        assert!(seeded);

        let again = store
            .seed_if_empty(vec![NewTodo::new("bob", "C")])
            .await
            .unwrap();
        assert!(!again);

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_seed_check_on_populated_store_only_reads() {
        let store = InMemoryTodoStore::with_todos([Todo::new(1, "alice", "A")]);
        let _reader = store.todos.read().await;

        let seeded = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            store.seed_if_empty(vec![NewTodo::new("bob", "B")]),
        )
        .await
        .expect("seed check blocked behind a reader")
        .unwrap();
        assert!(!seeded);
    }

    #[tokio::test]
    async fn test_concurrent_seeding_happens_once() {
        let store = Arc::new(InMemoryTodoStore::new());

        let handles = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .seed_if_empty(vec![
                        NewTodo::new(format!("user-{}", i), "A"),
                        NewTodo::new(format!("user-{}", i), "B"),
                    ])
                    .await
                    .unwrap()
            })
        });

        let mut seeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                seeded += 1;
            }
        }

        assert_eq!(seeded, 1);
        assert_eq!(store.len().await.unwrap(), 2);
    }
}
