//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the UM-Bridge router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let router = Router::new()
        // UM-Bridge protocol
        .route("/Info", get(handlers::info))
        .route("/InputSizes", post(handlers::input_sizes))
        .route("/OutputSizes", post(handlers::output_sizes))
        .route("/ModelInfo", post(handlers::model_info))
        .route("/Evaluate", post(handlers::evaluate))
        .route("/Gradient", post(handlers::unsupported))
        .route("/ApplyJacobian", post(handlers::unsupported))
        .route("/ApplyHessian", post(handlers::unsupported))
        // Health
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
