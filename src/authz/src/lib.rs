//! # TodoList Authorization
//!
//! Claims-based access decisions for a multi-tenant to-do list.
//!
//! ## Features
//!
//! - **Delegated and application access**: `ToDo.Read` scope sees the caller's
//!   own items, the `Todo.Read.All` role sees every item
//! - **Owner checks** on single-item reads and deletes
//! - **Injected storage** through the [`TodoStore`] trait
//! - **Decision metrics** per operation and outcome
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use todolist_authz::{
//!     claims, AccessDecisionEngine, CallerIdentity, EngineConfig, InMemoryTodoStore,
//! };
//!
//! # tokio_test::block_on(async {
//! let engine = AccessDecisionEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(InMemoryTodoStore::new()),
//! );
//!
//! let alice = CallerIdentity::new("Alice")
//!     .with_object_id("oid-alice")
//!     .with_scope(claims::TODO_READ)
//!     .with_scope(claims::TODO_WRITE);
//!
//! let created = engine.create(&alice, "Book flights").await.unwrap();
//! assert_eq!(created.owner, "oid-alice");
//!
//! let mine = engine.list(&alice).await.unwrap();
//! assert!(mine.iter().any(|t| t.id == created.id));
//! # });
//! ```

pub mod engine;
pub mod error;
pub mod identity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use engine::{AccessDecisionEngine, EngineConfig, EngineMetrics, ListAccess, Outcome};
pub use error::{AuthzError, Result};
pub use identity::{claims, CallerIdentity};
pub use store::{InMemoryTodoStore, Removal, TodoStore};
pub use types::{NewTodo, Operation, Todo, TodoId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
