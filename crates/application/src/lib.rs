//! Application layer for the gateway/inbox bridge
//!
//! Defines the ports both platform integrations implement and the
//! services that run the relay pipelines over them.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::{GatewayPort, InboxPort};
pub use services::{DispatchService, IdentityResolver, RelayPolicy, RelayService, Resolution};
