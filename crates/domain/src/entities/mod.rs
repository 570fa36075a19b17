//! Domain entities

pub mod inbound;
pub mod outbound;

pub use inbound::{MediaAttachment, MediaKind, NormalizedMessage};
pub use outbound::{AgentReply, AttachmentCategory, ReplyAttachment};
