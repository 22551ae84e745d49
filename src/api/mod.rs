mod handlers;
mod middleware;

pub use handlers::{RpcError, RpcResponse, API_KEY_HEADER, PROTOCOL_VERSION};
pub use middleware::REQUEST_ID_HEADER;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Services;
use crate::tools::Toolbox;

pub fn create_router(services: Services) -> Router {
    Router::new()
        // JSON-RPC and legacy tool calls
        .route("/", post(handlers::rpc))
        .route("/mcp", post(handlers::rpc))
        // Discovery
        .route("/mcp", get(handlers::list_tools))
        // Health
        .route("/health", get(handlers::health))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Toolbox::new(services))
}
