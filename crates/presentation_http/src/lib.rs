//! HTTP presentation layer
//!
//! Webhook endpoints for both platforms plus configuration loading
//! and the shared application state.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
