//! Ports - interfaces implemented by the platform integrations

pub mod gateway_port;
pub mod inbox_port;

pub use gateway_port::GatewayPort;
pub use inbox_port::{ContactCreateOutcome, Conversation, FoundContact, InboxPort, SourceId};

#[cfg(test)]
pub use gateway_port::MockGatewayPort;
#[cfg(test)]
pub use inbox_port::MockInboxPort;
