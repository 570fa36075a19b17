//! Inbox webhook handler
//!
//! Receives every message event the inbox platform emits and relays
//! outgoing agent replies back through the gateway. Like the gateway
//! side, the webhook is acknowledged before any sending happens.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use integration_chatwoot::{InboxEvent, to_agent_reply};
use tracing::{debug, instrument};

use crate::state::AppState;

/// Inbox webhook (POST)
#[instrument(skip(state, event), fields(event = ?event.event))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(event): Json<InboxEvent>,
) -> (StatusCode, &'static str) {
    let Some(reply) = to_agent_reply(&event) else {
        return ack();
    };

    debug!(phone = %reply.phone, attachments = reply.attachments.len(), "Accepted agent reply");

    let dispatch = Arc::clone(&state.dispatch);
    tokio::spawn(async move {
        dispatch.dispatch(&reply).await;
    });

    ack()
}

const fn ack() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
