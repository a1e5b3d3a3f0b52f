//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Two endpoints under `/api/ai`. CORS is wide open (any origin, method, and
//! header) because the dental app calls the relay from `file://` and
//! localhost pages.

pub mod ai;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ai/chat", post(ai::chat))
        .route("/api/ai/health", get(ai::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
