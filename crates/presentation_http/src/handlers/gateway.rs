//! Gateway webhook handler
//!
//! Receives one callback per customer message. The handler
//! acknowledges immediately and runs the relay pipeline on a spawned
//! task; the gateway retries on slow responses, so the ack must never
//! wait on the inbox platform.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use domain::PhoneNumber;
use integration_zapi::{InboundEvent, normalize, sender_display_name};
use tracing::{debug, error, instrument, warn};

use crate::state::AppState;

/// Gateway webhook (POST)
#[instrument(skip(state, event), fields(event_type = ?event.event_type))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> (StatusCode, &'static str) {
    let Some(message) = normalize(&event) else {
        return ack();
    };

    let Some(raw_phone) = event.phone.clone() else {
        warn!("Received message without a sender phone");
        return ack();
    };
    let phone = match PhoneNumber::new(&raw_phone) {
        Ok(phone) => phone,
        Err(error) => {
            warn!(%raw_phone, %error, "Received message with unusable phone");
            return ack();
        }
    };

    let display_name = sender_display_name(&event);
    debug!(%phone, "Accepted inbound message");

    let relay = Arc::clone(&state.relay);
    tokio::spawn(async move {
        if let Err(error) = relay.relay(&phone, &display_name, &message).await {
            error!(%phone, %error, "Inbound relay failed");
        }
    });

    ack()
}

const fn ack() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
