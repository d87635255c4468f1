use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use todolist_authz::{EngineMetrics, Todo, TodoId};
use utoipa::ToSchema;
use validator::Validate;

/// Maximum accepted title length
pub const MAX_TITLE_LEN: u64 = 1024;

/// Todo create request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    /// Item text
    #[serde(alias = "Title")]
    #[validate(length(max = MAX_TITLE_LEN))]
    pub title: String,
}

/// Todo replace request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    /// Must equal the id in the path
    #[serde(alias = "Id")]
    #[schema(value_type = i32)]
    pub id: TodoId,

    /// Item text
    #[serde(alias = "Title")]
    #[validate(length(max = MAX_TITLE_LEN))]
    pub title: String,

    /// Owner identifier stored with the item
    #[serde(alias = "Owner")]
    pub owner: String,
}

impl From<UpdateTodoRequest> for Todo {
    fn from(req: UpdateTodoRequest) -> Self {
        Todo::new(req.id, req.owner, req.title)
    }
}

/// Todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    #[schema(value_type = i32)]
    pub id: TodoId,
    pub owner: String,
    pub title: String,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            owner: todo.owner,
            title: todo.title,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Decision metrics summary
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    pub total_decisions: u64,
    pub allowed: u64,
    pub forbidden: u64,
    pub unauthorized: u64,
    pub not_found: u64,
    pub errors: u64,
    pub allow_rate: f64,
    pub avg_latency_ms: f64,
    /// Decisions keyed by operation, then outcome
    pub by_operation: BTreeMap<String, BTreeMap<String, u64>>,
}

impl From<EngineMetrics> for MetricsResponse {
    fn from(m: EngineMetrics) -> Self {
        Self {
            allow_rate: m.allow_rate(),
            total_decisions: m.total_decisions,
            allowed: m.allowed,
            forbidden: m.forbidden,
            unauthorized: m.unauthorized,
            not_found: m.not_found,
            errors: m.errors,
            avg_latency_ms: m.avg_latency_ms,
            by_operation: m.by_operation,
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_wire_format() {
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"id":3,"title":"Pay rent","owner":"oid-a"}"#).unwrap();
        assert!(req.validate().is_ok());

        let todo: Todo = req.into();
        assert_eq!(todo, Todo::new(3, "oid-a", "Pay rent"));
    }

    #[test]
    fn test_request_keys_accept_leading_capital() {
        let req: CreateTodoRequest = serde_json::from_str(r#"{"Title":"Buy milk"}"#).unwrap();
        assert_eq!(req.title, "Buy milk");

        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"Id":4,"Title":"Pay rent","Owner":"oid-a"}"#).unwrap();
        assert_eq!(Todo::from(req), Todo::new(4, "oid-a", "Pay rent"));
    }

    #[test]
    fn test_update_request_title_limit() {
        let req = UpdateTodoRequest {
            id: 1,
            title: "x".repeat(MAX_TITLE_LEN as usize + 1),
            owner: "o".repeat(4096),
        };
        assert!(req.validate().is_err());

        let req = UpdateTodoRequest {
            id: 1,
            title: "x".repeat(MAX_TITLE_LEN as usize),
            owner: "o".repeat(4096),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_oversized_title() {
        let req = CreateTodoRequest {
            title: "x".repeat(MAX_TITLE_LEN as usize + 1),
        };
        assert!(req.validate().is_err());

        let req = CreateTodoRequest {
            title: String::new(),
        };
        assert!(req.validate().is_ok());
    }
}
