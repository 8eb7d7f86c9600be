//! Router and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pagewatch_channels::SocketHub;
use pagewatch_core::config::GatewayConfig;
use pagewatch_core::traits::{Fetcher, TaskStore};
use pagewatch_scheduler::WatchScheduler;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub scheduler: WatchScheduler,
    /// Whether the recurring scheduler was enabled at bootstrap; new
    /// tasks only get timers when it was.
    pub scheduler_enabled: bool,
    pub store: Arc<dyn TaskStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub hub: Arc<SocketHub>,
    pub start_time: std::time::Instant,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/api/v1/info", get(super::routes::system_info))
        .route(
            "/api/v1/executions",
            get(super::routes::execute_once_query).post(super::routes::execute_once),
        )
        .route(
            "/api/v1/tasks",
            get(super::routes::list_tasks).post(super::routes::create_task),
        )
        .route("/api/v1/tasks/{id}", delete(super::routes::delete_task))
        .route(
            "/api/v1/tasks/{id}/reschedule",
            post(super::routes::reschedule_task),
        )
        .route("/ws", get(super::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(shared)
}
