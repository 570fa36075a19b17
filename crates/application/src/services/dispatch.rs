//! Outbound dispatch - agent replies back to the gateway
//!
//! Fans one agent reply out to the gateway's per-category send
//! endpoints. Attachment sends are independent of each other; one
//! failure never blocks its siblings.

use std::sync::Arc;

use domain::{AgentReply, AttachmentCategory};
use tracing::{debug, error, info, instrument};

use crate::ports::GatewayPort;

/// Dispatches agent replies to the gateway send endpoints
pub struct DispatchService {
    gateway: Arc<dyn GatewayPort>,
}

impl std::fmt::Debug for DispatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchService").finish_non_exhaustive()
    }
}

impl DispatchService {
    /// Create a dispatcher over a gateway port
    pub fn new(gateway: Arc<dyn GatewayPort>) -> Self {
        Self { gateway }
    }

    /// Dispatch one reply: per-attachment sends in order, or a single
    /// text send when there are no attachments
    ///
    /// Failures terminate in the log; the webhook was acknowledged
    /// long before this runs.
    #[instrument(skip(self, reply), fields(phone = %reply.phone, attachments = reply.attachments.len()))]
    pub async fn dispatch(&self, reply: &AgentReply) {
        if reply.attachments.is_empty() {
            if reply.text.trim().is_empty() {
                debug!("Reply carries neither text nor attachments, nothing to send");
                return;
            }
            match self.gateway.send_text(&reply.phone, &reply.text).await {
                Ok(()) => info!("Text reply sent"),
                Err(err) => error!(%err, "Text send failed"),
            }
            return;
        }

        for (index, attachment) in reply.attachments.iter().enumerate() {
            let result = match attachment.category {
                AttachmentCategory::Image => {
                    self.gateway
                        .send_image(&reply.phone, &attachment.url, &reply.text)
                        .await
                }
                AttachmentCategory::Audio => {
                    self.gateway.send_audio(&reply.phone, &attachment.url).await
                }
                AttachmentCategory::Video => {
                    self.gateway
                        .send_video(&reply.phone, &attachment.url, &reply.text)
                        .await
                }
                AttachmentCategory::Other => {
                    self.gateway
                        .send_document(&reply.phone, &attachment.url, &attachment.extension_guess())
                        .await
                }
            };

            match result {
                Ok(()) => debug!(index, category = ?attachment.category, "Attachment sent"),
                Err(err) => error!(index, category = ?attachment.category, %err, "Attachment send failed"),
            }
        }
    }
}
