//! Core todo types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique todo identifier
pub type TodoId = i32;

/// A to-do item owned by one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Identifier assigned by the store on creation
    pub id: TodoId,

    /// Owner identifier (object id or display name of the creator)
    pub owner: String,

    /// Item text
    pub title: String,
}

impl Todo {
    pub fn new(id: TodoId, owner: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
            title: title.into(),
        }
    }

    /// Whether `owner` owns this item
    ///
    /// An absent owner never matches, not even an empty stored owner.
    pub fn is_owned_by(&self, owner: Option<&str>) -> bool {
        owner.is_some_and(|o| self.owner == o)
    }
}

/// Input to [`TodoStore::insert`](crate::store::TodoStore::insert); the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub owner: String,
    pub title: String,
}

impl NewTodo {
    pub fn new(owner: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            title: title.into(),
        }
    }
}

/// Operations governed by the access decision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    ReadOne,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::ReadOne,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::ReadOne => "read_one",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = Todo::new(7, "alice", "Water plants");
        let json = serde_json::to_value(&todo).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["owner"], "alice");
        assert_eq!(json["title"], "Water plants");
    }

    #[test]
    fn test_ownership_requires_present_owner() {
        let todo = Todo::new(1, "", "Orphan");
        assert!(!todo.is_owned_by(None));
        assert!(todo.is_owned_by(Some("")));

        let todo = Todo::new(2, "alice", "Mine");
        assert!(todo.is_owned_by(Some("alice")));
        assert!(!todo.is_owned_by(Some("bob")));
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(Operation::ReadOne.to_string(), "read_one");
        assert_eq!(Operation::ALL.len(), 5);
    }
}
