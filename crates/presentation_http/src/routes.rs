//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        // Gateway webhook: inbound customer messages
        .route("/webhook/zapi", post(handlers::gateway::handle_webhook))
        // Inbox webhook: outbound agent replies
        .route("/webhook/chatwoot", post(handlers::inbox::handle_webhook))
        .with_state(state)
}
