//! Chatwoot client behind the inbox port
//!
//! All endpoints live under `api/v1/accounts/{account_id}/` and are
//! authenticated with the `api_access_token` header. The attachment
//! relay streams the remote resource straight into the multipart
//! upload; resources may be large and are never buffered whole.

use std::time::Duration;

use application::ApplicationError;
use application::ports::{ContactCreateOutcome, Conversation, FoundContact, InboxPort, SourceId};
use async_trait::async_trait;
use domain::{MediaAttachment, PhoneNumber};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a streamed attachment, checked against the source's
/// Content-Length before any bytes move
const MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Chatwoot API errors
#[derive(Debug, Error)]
pub enum ChatwootError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inbox API error: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing configuration: {0}")]
    Configuration(String),

    #[error("Attachment of {size} bytes exceeds the {limit} byte limit")]
    AttachmentTooLarge { size: u64, limit: u64 },

    #[error("Invalid attachment metadata: {0}")]
    InvalidAttachment(String),

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),
}

impl From<ChatwootError> for ApplicationError {
    fn from(error: ChatwootError) -> Self {
        match error {
            ChatwootError::Request(e) => Self::Transport(e.to_string()),
            ChatwootError::Api { status, body } => Self::Remote { status, body },
            ChatwootError::Configuration(msg) => Self::Configuration(msg),
            other => Self::ExternalService(other.to_string()),
        }
    }
}

/// Chatwoot client configuration
#[derive(Debug, Clone)]
pub struct ChatwootClientConfig {
    /// Base URL of the Chatwoot installation
    pub base_url: String,
    /// Profile access token
    pub access_token: SecretString,
    /// Account the contacts and conversations belong to
    pub account_id: u64,
    /// Inbox (channel) the relayed phone numbers are bound to
    pub inbox_id: u64,
}

/// Client for the Chatwoot REST API
#[derive(Debug, Clone)]
pub struct ChatwootClient {
    client: Client,
    config: ChatwootClientConfig,
}

#[derive(Debug, Deserialize)]
struct ContactCreateResponse {
    payload: ContactCreatePayload,
}

#[derive(Debug, Deserialize)]
struct ContactCreatePayload {
    contact: ContactRecord,
}

#[derive(Debug, Deserialize)]
struct ContactSearchResponse {
    #[serde(default)]
    payload: Vec<ContactRecord>,
}

#[derive(Debug, Deserialize)]
struct ContactRecord {
    id: u64,
    #[serde(default)]
    contact_inboxes: Vec<ContactInboxRecord>,
}

#[derive(Debug, Deserialize)]
struct ContactInboxRecord {
    source_id: String,
    #[serde(default)]
    inbox: Option<InboxRecord>,
}

#[derive(Debug, Deserialize)]
struct InboxRecord {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ContactInboxCreateResponse {
    source_id: String,
}

#[derive(Debug, Deserialize)]
struct ConversationResponse {
    id: u64,
    #[serde(default)]
    labels: Vec<String>,
}

impl ChatwootClient {
    /// Create a new Chatwoot client
    pub fn new(config: ChatwootClientConfig) -> Result<Self, ChatwootError> {
        if config.base_url.is_empty() {
            return Err(ChatwootError::Configuration(
                "base_url is required".to_string(),
            ));
        }
        if config.access_token.expose_secret().is_empty() {
            return Err(ChatwootError::Configuration(
                "access_token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client, config })
    }

    fn api(&self, path: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/{path}",
            self.config.base_url, self.config.account_id
        )
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("api_access_token", self.config.access_token.expose_secret())
    }

    /// Turn a non-success response into an API error carrying whatever
    /// diagnostics the platform provided
    async fn check(response: Response) -> Result<Response, ChatwootError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ChatwootError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn link_for_inbox(&self, record: &ContactRecord) -> Option<SourceId> {
        record
            .contact_inboxes
            .iter()
            .find(|link| {
                link.inbox
                    .as_ref()
                    .is_some_and(|inbox| inbox.id == self.config.inbox_id)
            })
            .map(|link| SourceId::new(link.source_id.clone()))
    }

    async fn do_create_contact(
        &self,
        phone: &PhoneNumber,
        name: &str,
    ) -> Result<ContactCreateOutcome, ChatwootError> {
        let response = self
            .authed(self.client.post(self.api("contacts")))
            .json(&serde_json::json!({
                "inbox_id": self.config.inbox_id,
                "name": name,
                "phone_number": phone.e164(),
            }))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 422 {
            // The platform reports an already-registered phone as a
            // validation failure; expected under concurrent delivery.
            let body = response.text().await.unwrap_or_default();
            if body.to_ascii_lowercase().contains("taken") {
                debug!(%phone, "Contact create conflicted, phone already registered");
                return Ok(ContactCreateOutcome::PhoneTaken);
            }
            return Err(ChatwootError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ContactCreateResponse = Self::check(response).await?.json().await?;
        let source_id = self
            .link_for_inbox(&parsed.payload.contact)
            .ok_or_else(|| {
                ChatwootError::InvalidResponse(
                    "contact create response carried no link for the configured inbox".to_string(),
                )
            })?;
        Ok(ContactCreateOutcome::Created(source_id))
    }

    async fn do_search_contact(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<FoundContact>, ChatwootError> {
        let response = self
            .authed(self.client.get(self.api("contacts/search")))
            .query(&[("q", phone.as_str())])
            .send()
            .await?;

        let parsed: ContactSearchResponse = Self::check(response).await?.json().await?;
        Ok(parsed.payload.first().map(|record| FoundContact {
            contact_id: record.id,
            channel_link: self.link_for_inbox(record),
        }))
    }

    async fn do_create_contact_inbox(&self, contact_id: u64) -> Result<SourceId, ChatwootError> {
        let response = self
            .authed(
                self.client
                    .post(self.api(&format!("contacts/{contact_id}/contact_inboxes"))),
            )
            .json(&serde_json::json!({ "inbox_id": self.config.inbox_id }))
            .send()
            .await?;

        let parsed: ContactInboxCreateResponse = Self::check(response).await?.json().await?;
        Ok(SourceId::new(parsed.source_id))
    }

    async fn do_open_conversation(
        &self,
        source_id: &SourceId,
    ) -> Result<Conversation, ChatwootError> {
        let response = self
            .authed(self.client.post(self.api("conversations")))
            .json(&serde_json::json!({
                "source_id": source_id.as_str(),
                "inbox_id": self.config.inbox_id,
                "status": "open",
            }))
            .send()
            .await?;

        let parsed: ConversationResponse = Self::check(response).await?.json().await?;
        Ok(Conversation {
            id: parsed.id,
            labels: parsed.labels,
        })
    }

    async fn do_add_labels(
        &self,
        conversation_id: u64,
        labels: &[String],
    ) -> Result<(), ChatwootError> {
        let response = self
            .authed(
                self.client
                    .post(self.api(&format!("conversations/{conversation_id}/labels"))),
            )
            .json(&serde_json::json!({ "labels": labels }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn do_post_text_message(
        &self,
        conversation_id: u64,
        content: &str,
    ) -> Result<(), ChatwootError> {
        let response = self
            .authed(
                self.client
                    .post(self.api(&format!("conversations/{conversation_id}/messages"))),
            )
            .json(&serde_json::json!({
                "content": content,
                "message_type": "incoming",
                "private": false,
            }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn do_post_attachment_message(
        &self,
        conversation_id: u64,
        caption: &str,
        attachment: &MediaAttachment,
    ) -> Result<(), ChatwootError> {
        let download = Self::check(self.client.get(&attachment.url).send().await?).await?;

        let length = download.content_length();
        if let Some(size) = length {
            if size > MAX_ATTACHMENT_BYTES {
                return Err(ChatwootError::AttachmentTooLarge {
                    size,
                    limit: MAX_ATTACHMENT_BYTES,
                });
            }
        }

        let stream = reqwest::Body::wrap_stream(download.bytes_stream());
        let part = match length {
            Some(size) => Part::stream_with_length(stream, size),
            None => Part::stream(stream),
        }
        .file_name(attachment.filename.clone())
        .mime_str(&attachment.mime_type)
        .map_err(|e| ChatwootError::InvalidAttachment(format!("bad MIME type: {e}")))?;

        let mut form = Form::new()
            .text("message_type", "incoming")
            .text("private", "false")
            .part("attachments[]", part);
        if !caption.trim().is_empty() {
            form = form.text("content", caption.to_string());
        }

        debug!(
            conversation_id,
            filename = %attachment.filename,
            mime_type = %attachment.mime_type,
            length,
            "Relaying attachment"
        );

        let response = self
            .authed(
                self.client
                    .post(self.api(&format!("conversations/{conversation_id}/messages"))),
            )
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl InboxPort for ChatwootClient {
    #[instrument(skip(self, name), fields(phone = %phone))]
    async fn create_contact(
        &self,
        phone: &PhoneNumber,
        name: &str,
    ) -> Result<ContactCreateOutcome, ApplicationError> {
        self.do_create_contact(phone, name).await.map_err(Into::into)
    }

    #[instrument(skip(self), fields(phone = %phone))]
    async fn search_contact(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<FoundContact>, ApplicationError> {
        self.do_search_contact(phone).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn create_contact_inbox(&self, contact_id: u64) -> Result<SourceId, ApplicationError> {
        self.do_create_contact_inbox(contact_id)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn open_conversation(
        &self,
        source_id: &SourceId,
    ) -> Result<Conversation, ApplicationError> {
        self.do_open_conversation(source_id).await.map_err(Into::into)
    }

    #[instrument(skip(self, labels))]
    async fn add_labels(
        &self,
        conversation_id: u64,
        labels: &[String],
    ) -> Result<(), ApplicationError> {
        self.do_add_labels(conversation_id, labels)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, content))]
    async fn post_text_message(
        &self,
        conversation_id: u64,
        content: &str,
    ) -> Result<(), ApplicationError> {
        self.do_post_text_message(conversation_id, content)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, caption, attachment), fields(url = %attachment.url))]
    async fn post_attachment_message(
        &self,
        conversation_id: u64,
        caption: &str,
        attachment: &MediaAttachment,
    ) -> Result<(), ApplicationError> {
        self.do_post_attachment_message(conversation_id, caption, attachment)
            .await
            .map_err(Into::into)
    }
}
