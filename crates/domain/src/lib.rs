//! Domain layer for the gateway/inbox bridge
//!
//! Contains the canonical message shapes and value objects shared by
//! both relay directions. This layer performs no IO.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
