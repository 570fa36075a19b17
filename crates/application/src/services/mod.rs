//! Application services

pub mod dispatch;
pub mod identity;
pub mod relay;

pub use dispatch::DispatchService;
pub use identity::{IdentityResolver, Resolution};
pub use relay::{RelayPolicy, RelayService};
