// REST API server for the multi-tenant to-do list

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{AuthConfig, Caller};
pub use error::{ApiError, Result};
pub use server::{Server, ServerConfig};
pub use state::AppState;
