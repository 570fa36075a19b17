//! Inbox port - interface to the customer-support inbox platform
//!
//! The inbox platform owns contacts, contact-inbox links, conversations
//! and labels; this system only ever asks it to create or reuse them.

#[cfg(test)]
use mockall::automock;

use std::fmt;

use async_trait::async_trait;
use domain::{MediaAttachment, PhoneNumber};
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Opaque handle binding one phone number to one inbox channel
///
/// Issued by the inbox platform; required to open a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Wrap a platform-issued identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as issued by the platform
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a contact-create call
///
/// The conflict case is expected under concurrent webhook delivery for
/// the same phone and is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactCreateOutcome {
    /// Contact was created; the channel link came back with it
    Created(SourceId),
    /// The phone number is already registered with another contact
    PhoneTaken,
}

/// A contact located via search-by-phone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundContact {
    /// Platform id of the contact record
    pub contact_id: u64,
    /// The contact's link for the configured channel, when one exists
    ///
    /// The adapter pre-filters the contact's links down to the channel
    /// it is configured for.
    pub channel_link: Option<SourceId>,
}

/// An open conversation thread on the inbox platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Platform id of the thread
    pub id: u64,
    /// Labels currently applied to the thread
    pub labels: Vec<String>,
}

/// Port for all inbox-platform operations the relay needs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InboxPort: Send + Sync {
    /// Create a contact scoped to the configured channel
    async fn create_contact(
        &self,
        phone: &PhoneNumber,
        name: &str,
    ) -> Result<ContactCreateOutcome, ApplicationError>;

    /// Look up a contact by phone number
    async fn search_contact(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<FoundContact>, ApplicationError>;

    /// Create the missing channel link for an existing contact
    async fn create_contact_inbox(&self, contact_id: u64) -> Result<SourceId, ApplicationError>;

    /// Open (or reuse) the conversation for a source identity
    ///
    /// Server-side idempotent: repeating the call for an identity with
    /// an open thread returns that thread.
    async fn open_conversation(
        &self,
        source_id: &SourceId,
    ) -> Result<Conversation, ApplicationError>;

    /// Replace the conversation's label set
    async fn add_labels(
        &self,
        conversation_id: u64,
        labels: &[String],
    ) -> Result<(), ApplicationError>;

    /// Post an incoming text message into a conversation
    async fn post_text_message(
        &self,
        conversation_id: u64,
        content: &str,
    ) -> Result<(), ApplicationError>;

    /// Relay a remote media resource into a conversation as an
    /// incoming message with a binary attachment
    async fn post_attachment_message(
        &self,
        conversation_id: u64,
        caption: &str,
        attachment: &MediaAttachment,
    ) -> Result<(), ApplicationError>;
}
