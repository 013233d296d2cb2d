//! The command endpoint, mounted at `/` and `/function`.

use crate::handlers::execute;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Largest accepted command body. Longer bodies fail in the handler, so the
/// caller still gets the error envelope.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn command_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(execute))
        .route("/function", post(execute))
        .with_state(state)
}

/// Command endpoint plus health, readiness and version, with permissive CORS
/// and the body limit on every route.
pub fn app(state: AppState) -> Router {
    command_routes(state.clone())
        .merge(super::common_routes_with_ready(state))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
}
