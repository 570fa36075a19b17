//! Chatwoot integration
//!
//! Support-inbox adapter: the REST client behind the inbox port
//! (contacts, conversations, labels, messages, streamed attachment
//! relay) and the `message_created` webhook payload with agent-reply
//! extraction.

pub mod client;
pub mod webhook;

pub use client::{ChatwootClient, ChatwootClientConfig, ChatwootError};
pub use webhook::{InboxEvent, to_agent_reply};
