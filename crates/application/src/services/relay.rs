//! Inbound relay pipeline
//!
//! Runs one normalized gateway message through identity resolution,
//! conversation open, the workflow label gate and the final message
//! post. Steps are strictly sequential; each step's output feeds the
//! next.

use std::sync::Arc;
use std::time::Duration;

use domain::{NormalizedMessage, PhoneNumber};
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{Conversation, InboxPort};
use crate::services::identity::IdentityResolver;

/// Labeling policy for freshly-relevant conversations
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    /// Label that triggers downstream automation
    pub workflow_label: String,
    /// Labels that mark a conversation as human-handled; their
    /// presence permanently suppresses the workflow label
    pub human_labels: Vec<String>,
    /// Pause between the label write and the message post, covering
    /// the platform's write-to-visibility window
    pub settle_delay: Duration,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            workflow_label: "workflow".to_string(),
            human_labels: vec!["agent-off".to_string(), "manager".to_string()],
            settle_delay: Duration::from_millis(400),
        }
    }
}

/// Relays normalized inbound messages into the inbox platform
pub struct RelayService {
    inbox: Arc<dyn InboxPort>,
    resolver: IdentityResolver,
    policy: RelayPolicy,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Create a relay service over an inbox port
    pub fn new(inbox: Arc<dyn InboxPort>, policy: RelayPolicy) -> Self {
        let resolver = IdentityResolver::new(Arc::clone(&inbox));
        Self {
            inbox,
            resolver,
            policy,
        }
    }

    /// Relay one message: resolve identity, open the conversation,
    /// gate the workflow label, post text or attachment
    #[instrument(skip(self, message), fields(phone = %phone, has_attachment = message.has_attachment()))]
    pub async fn relay(
        &self,
        phone: &PhoneNumber,
        display_name: &str,
        message: &NormalizedMessage,
    ) -> Result<(), ApplicationError> {
        let resolution = self.resolver.resolve(phone, display_name).await?;
        let conversation = self.inbox.open_conversation(resolution.source_id()).await?;

        self.apply_workflow_label(&conversation).await;

        match &message.attachment {
            Some(attachment) => {
                self.inbox
                    .post_attachment_message(conversation.id, &message.text, attachment)
                    .await?;
            }
            None => {
                self.inbox
                    .post_text_message(conversation.id, &message.text)
                    .await?;
            }
        }

        info!(conversation_id = conversation.id, "Message relayed");
        Ok(())
    }

    /// Label gate: write the workflow label exactly once, before the
    /// first message, unless a human took over
    ///
    /// Best-effort: failures are logged and swallowed, labeling must
    /// never abort message delivery.
    async fn apply_workflow_label(&self, conversation: &Conversation) {
        let human = self
            .policy
            .human_labels
            .iter()
            .find(|label| conversation.labels.contains(label));
        if let Some(label) = human {
            debug!(
                conversation_id = conversation.id,
                label, "Human-handling label present, workflow label suppressed"
            );
            return;
        }

        if conversation.labels.contains(&self.policy.workflow_label) {
            debug!(
                conversation_id = conversation.id,
                "Workflow label already present"
            );
            return;
        }

        // The labels endpoint replaces the whole set, so the write
        // carries the existing labels plus ours.
        let mut labels = conversation.labels.clone();
        labels.push(self.policy.workflow_label.clone());

        match self.inbox.add_labels(conversation.id, &labels).await {
            Ok(()) => {
                // The downstream automation matches "message created in
                // a labeled conversation"; the label write must be
                // visible before the message event fires.
                tokio::time::sleep(self.policy.settle_delay).await;
            }
            Err(error) => {
                warn!(
                    conversation_id = conversation.id,
                    %error,
                    "Label write failed, continuing without workflow label"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use mockall::Sequence;

    use super::*;
    use crate::ports::{ContactCreateOutcome, MockInboxPort, SourceId};

    fn phone() -> PhoneNumber {
        PhoneNumber::new("5511999999999").unwrap()
    }

    fn text_message(text: &str) -> NormalizedMessage {
        NormalizedMessage::new(text, None).unwrap()
    }

    fn policy_with_delay(millis: u64) -> RelayPolicy {
        RelayPolicy {
            settle_delay: Duration::from_millis(millis),
            ..RelayPolicy::default()
        }
    }

    fn expect_fresh_identity(inbox: &mut MockInboxPort, labels: Vec<String>) {
        inbox
            .expect_create_contact()
            .times(1)
            .returning(|_, _| Ok(ContactCreateOutcome::Created(SourceId::new("src-1"))));
        inbox
            .expect_open_conversation()
            .times(1)
            .returning(move |_| {
                Ok(Conversation {
                    id: 10,
                    labels: labels.clone(),
                })
            });
    }

    #[tokio::test]
    async fn fresh_phone_runs_full_pipeline() {
        let mut inbox = MockInboxPort::new();
        expect_fresh_identity(&mut inbox, vec![]);
        inbox
            .expect_add_labels()
            .times(1)
            .withf(|id, labels| *id == 10 && labels == ["workflow".to_string()])
            .returning(|_, _| Ok(()));
        inbox
            .expect_post_text_message()
            .times(1)
            .withf(|id, content| *id == 10 && content == "Hello")
            .returning(|_, _| Ok(()));

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        service
            .relay(&phone(), "Alice", &text_message("Hello"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn workflow_label_already_present_skips_label_write() {
        let mut inbox = MockInboxPort::new();
        expect_fresh_identity(&mut inbox, vec!["workflow".to_string()]);
        inbox.expect_add_labels().times(0);
        inbox
            .expect_post_text_message()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        service
            .relay(&phone(), "Alice", &text_message("Again"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn human_label_suppresses_workflow_label() {
        let mut inbox = MockInboxPort::new();
        expect_fresh_identity(&mut inbox, vec!["agent-off".to_string()]);
        inbox.expect_add_labels().times(0);
        inbox
            .expect_post_text_message()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        service
            .relay(&phone(), "Alice", &text_message("Hi"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn label_write_precedes_message_and_settles() {
        let mut sequence = Sequence::new();
        let mut inbox = MockInboxPort::new();
        inbox
            .expect_create_contact()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(ContactCreateOutcome::Created(SourceId::new("src-1"))));
        inbox
            .expect_open_conversation()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Conversation { id: 10, labels: vec![] }));
        inbox
            .expect_add_labels()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        inbox
            .expect_post_text_message()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(80));
        let start = Instant::now();
        service
            .relay(&phone(), "Alice", &text_message("Hello"))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn label_failure_does_not_abort_delivery() {
        let mut inbox = MockInboxPort::new();
        expect_fresh_identity(&mut inbox, vec![]);
        inbox.expect_add_labels().times(1).returning(|_, _| {
            Err(ApplicationError::Remote {
                status: 500,
                body: "label error".to_string(),
            })
        });
        inbox
            .expect_post_text_message()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        service
            .relay(&phone(), "Alice", &text_message("Hello"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn attachment_message_uses_attachment_post() {
        use domain::{MediaAttachment, MediaKind};

        let mut inbox = MockInboxPort::new();
        expect_fresh_identity(&mut inbox, vec!["workflow".to_string()]);
        inbox
            .expect_post_attachment_message()
            .times(1)
            .withf(|id, caption, attachment| {
                *id == 10 && caption == "look" && attachment.filename == "image.jpg"
            })
            .returning(|_, _, _| Ok(()));
        inbox.expect_post_text_message().times(0);

        let attachment = MediaAttachment {
            url: "https://media.example/pic".to_string(),
            filename: "image.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            kind: MediaKind::Image,
        };
        let message = NormalizedMessage::new("look", Some(attachment)).unwrap();

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        service.relay(&phone(), "Alice", &message).await.unwrap();
    }

    #[tokio::test]
    async fn open_failure_aborts_before_message_post() {
        let mut inbox = MockInboxPort::new();
        inbox
            .expect_create_contact()
            .times(1)
            .returning(|_, _| Ok(ContactCreateOutcome::Created(SourceId::new("src-1"))));
        inbox.expect_open_conversation().times(1).returning(|_| {
            Err(ApplicationError::Remote {
                status: 503,
                body: "down".to_string(),
            })
        });
        inbox.expect_add_labels().times(0);
        inbox.expect_post_text_message().times(0);

        let service = RelayService::new(Arc::new(inbox), policy_with_delay(1));
        let result = service.relay(&phone(), "Alice", &text_message("Hello")).await;

        assert!(matches!(
            result,
            Err(ApplicationError::Remote { status: 503, .. })
        ));
    }
}
