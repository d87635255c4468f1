//! Route definitions for the API server
//!
//! - Health and metrics endpoints (no bearer token)
//! - Todo endpoints (bearer token, claims checked per operation)
//! - OpenAPI documentation

use crate::{handlers, middleware, state::AppState};
use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TodoList API",
        version = "1.0.0",
        description = "Multi-tenant to-do list with claims-based authorization",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::prometheus_metrics,
        handlers::metrics_summary,
        handlers::list_todos,
        handlers::get_todo,
        handlers::create_todo,
        handlers::update_todo,
        handlers::delete_todo,
    ),
    components(
        schemas(
            crate::models::HealthResponse,
            crate::models::MetricsResponse,
            crate::models::CreateTodoRequest,
            crate::models::UpdateTodoRequest,
            crate::models::TodoResponse,
            crate::models::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health endpoint"),
        (name = "metrics", description = "Decision metrics"),
        (name = "todos", description = "To-do items"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let todo_routes = Router::new()
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/:id",
            get(handlers::get_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        );

    Router::new()
        // Health and metrics (no bearer token)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/metrics/summary", get(handlers::metrics_summary))
        .merge(todo_routes)
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Middleware layers (executed bottom to top)
        .layer(axum_middleware::from_fn(middleware::error_handling_middleware))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}
