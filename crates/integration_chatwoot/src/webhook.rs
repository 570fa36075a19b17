//! Chatwoot webhook payload and agent-reply extraction
//!
//! The inbox platform fires `message_created` for every message in
//! every direction; only outgoing, non-private agent replies are
//! relayed back to the gateway.

use domain::{AgentReply, AttachmentCategory, PhoneNumber, ReplyAttachment};
use serde::Deserialize;
use tracing::{debug, warn};

const MESSAGE_CREATED: &str = "message_created";
const OUTGOING: &str = "outgoing";

/// One inbox-platform webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct InboxEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    /// Private notes never leave the inbox
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub conversation: Option<ConversationContext>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub meta: Option<ConversationMeta>,
    #[serde(default)]
    pub contact_inbox: Option<ContactInboxContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationMeta {
    #[serde(default)]
    pub sender: Option<SenderContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderContext {
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInboxContext {
    #[serde(default)]
    pub contact: Option<ContactContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactContext {
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentRecord {
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Destination phone, taken from the linked contact first and the
/// conversation sender as fallback
fn extract_phone(event: &InboxEvent) -> Option<String> {
    let conversation = event.conversation.as_ref()?;

    conversation
        .contact_inbox
        .as_ref()
        .and_then(|link| link.contact.as_ref())
        .and_then(|contact| contact.phone_number.clone())
        .filter(|phone| !phone.trim().is_empty())
        .or_else(|| {
            conversation
                .meta
                .as_ref()
                .and_then(|meta| meta.sender.as_ref())
                .and_then(|sender| sender.phone_number.clone())
                .filter(|phone| !phone.trim().is_empty())
        })
}

/// Reduce one webhook event to an agent reply ready for dispatch
///
/// Returns `None` for everything that must not be relayed: other event
/// kinds, incoming messages, private notes, events with no resolvable
/// phone. A filter, not an error.
pub fn to_agent_reply(event: &InboxEvent) -> Option<AgentReply> {
    if event.event.as_deref() != Some(MESSAGE_CREATED) {
        debug!(event = ?event.event, "Dropping non message-created event");
        return None;
    }
    if event.message_type.as_deref() != Some(OUTGOING) {
        debug!(message_type = ?event.message_type, "Dropping non-outgoing message");
        return None;
    }
    if event.private {
        debug!("Dropping private note");
        return None;
    }

    let Some(raw_phone) = extract_phone(event) else {
        debug!("Dropping agent reply with no resolvable phone");
        return None;
    };

    let phone = match PhoneNumber::new(&raw_phone) {
        Ok(phone) => phone,
        Err(error) => {
            warn!(%raw_phone, %error, "Dropping agent reply with unusable phone");
            return None;
        }
    };

    let attachments = event
        .attachments
        .iter()
        .filter_map(|record| {
            record.data_url.clone().map(|url| ReplyAttachment {
                url,
                category: AttachmentCategory::from_file_type(
                    record.file_type.as_deref().unwrap_or_default(),
                ),
            })
        })
        .collect();

    Some(AgentReply {
        phone,
        text: event.content.clone().unwrap_or_default(),
        attachments,
    })
}
