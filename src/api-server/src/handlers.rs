use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use todolist_authz::{EngineMetrics, Operation, Outcome, Todo, TodoId};
use tracing::{debug, error};
use validator::Validate;

use crate::{
    auth::Caller,
    error::{ApiError, Result},
    models::*,
    state::AppState,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// List the caller's items, or every item for the `Todo.Read.All` role
#[utoipa::path(
    get,
    path = "/todos",
    responses(
        (status = 200, description = "Visible items", body = Vec<TodoResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "No ToDo.Read scope or Todo.Read.All", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "todos"
)]
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<Vec<TodoResponse>>> {
    let todos = state.engine.list(&caller).await?;
    debug!(count = todos.len(), "Listed todos");
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// Get one of the caller's items
#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(
        ("id" = i32, Path, description = "Todo id")
    ),
    responses(
        (status = 200, description = "The item", body = TodoResponse),
        (status = 204, description = "No such item owned by the caller"),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Missing ToDo.Read scope", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "todos"
)]
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(id): Path<TodoId>,
) -> Result<Response> {
    match state.engine.read_one(&caller, id).await? {
        Some(todo) => Ok(Json(TodoResponse::from(todo)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 200, description = "Created item", body = TodoResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "ToDo.Write policy not satisfied", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "todos"
)]
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Json(req): Json<CreateTodoRequest>,
) -> Result<Json<TodoResponse>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let todo = state.engine.create(&caller, req.title).await?;
    Ok(Json(todo.into()))
}

/// Replace an item
#[utoipa::path(
    patch,
    path = "/todos/{id}",
    params(
        ("id" = i32, Path, description = "Todo id; must equal the body id")
    ),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Stored item", body = TodoResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Bad bearer token, or not the owner", body = ErrorResponse),
        (status = 403, description = "Policy not satisfied", body = ErrorResponse),
        (status = 404, description = "Id mismatch or no such item", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "todos"
)]
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(id): Path<TodoId>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let todo = state.engine.update(&caller, id, Todo::from(req)).await?;
    Ok(Json(todo.into()))
}

/// Delete one of the caller's items
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(
        ("id" = i32, Path, description = "Todo id")
    ),
    responses(
        (status = 200, description = "Deleted, or no such item"),
        (status = 401, description = "Bad bearer token, or not the owner", body = ErrorResponse),
        (status = 403, description = "ToDo.Write policy not satisfied", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "todos"
)]
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(id): Path<TodoId>,
) -> Result<StatusCode> {
    state.engine.delete(&caller, id).await?;
    Ok(StatusCode::OK)
}

/// Get metrics (Prometheus format)
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics", body = String)
    ),
    tag = "metrics"
)]
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = state.engine.get_metrics().await else {
        return (StatusCode::NOT_FOUND, "metrics disabled\n").into_response();
    };

    match render_prometheus(&metrics, state.uptime_seconds()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics\n").into_response()
        }
    }
}

/// Render an engine metrics snapshot in the Prometheus text format
fn render_prometheus(metrics: &EngineMetrics, uptime_seconds: u64) -> prometheus::Result<String> {
    let registry = Registry::new();

    let decisions = IntCounterVec::new(
        Opts::new("todo_decisions_total", "Access decisions by operation and outcome"),
        &["operation", "outcome"],
    )?;
    registry.register(Box::new(decisions.clone()))?;

    for operation in Operation::ALL {
        for outcome in Outcome::ALL {
            decisions
                .with_label_values(&[operation.as_str(), outcome.as_str()])
                .inc_by(metrics.count(operation, outcome));
        }
    }

    let latency = Gauge::new("todo_decision_latency_avg_ms", "Average decision latency")?;
    registry.register(Box::new(latency.clone()))?;
    latency.set(metrics.avg_latency_ms);

    let uptime = IntGauge::new("todo_uptime_seconds", "Server uptime")?;
    registry.register(Box::new(uptime.clone()))?;
    uptime.set(i64::try_from(uptime_seconds).unwrap_or(i64::MAX));

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Get metrics summary
#[utoipa::path(
    get,
    path = "/metrics/summary",
    responses(
        (status = 200, description = "Metrics summary", body = MetricsResponse),
        (status = 404, description = "Metrics disabled", body = ErrorResponse)
    ),
    tag = "metrics"
)]
pub async fn metrics_summary(State(state): State<Arc<AppState>>) -> Result<Json<MetricsResponse>> {
    state
        .engine
        .get_metrics()
        .await
        .map(|m| Json(m.into()))
        .ok_or_else(|| ApiError::NotFound("metrics disabled".to_string()))
}
