//! Application state shared across handlers

use std::sync::Arc;

use application::{DispatchService, RelayService};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Inbound pipeline: gateway messages into the inbox
    pub relay: Arc<RelayService>,
    /// Outbound pipeline: agent replies back through the gateway
    pub dispatch: Arc<DispatchService>,
}
