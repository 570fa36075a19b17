//! Gateway port - interface to the WhatsApp gateway's send endpoints
//!
//! The gateway exposes one send endpoint per content category; the
//! dispatcher picks the operation matching an attachment's category.

#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;
use domain::PhoneNumber;

use crate::error::ApplicationError;

/// Port for the per-category send operations of the gateway
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GatewayPort: Send + Sync {
    /// Send a plain text message
    async fn send_text(
        &self,
        phone: &PhoneNumber,
        message: &str,
    ) -> Result<(), ApplicationError>;

    /// Send an image by URL with an optional caption
    async fn send_image(
        &self,
        phone: &PhoneNumber,
        url: &str,
        caption: &str,
    ) -> Result<(), ApplicationError>;

    /// Send an audio file by URL (the gateway supports no caption here)
    async fn send_audio(&self, phone: &PhoneNumber, url: &str) -> Result<(), ApplicationError>;

    /// Send a video by URL with an optional caption
    async fn send_video(
        &self,
        phone: &PhoneNumber,
        url: &str,
        caption: &str,
    ) -> Result<(), ApplicationError>;

    /// Send a generic document by URL under a guessed file extension
    async fn send_document(
        &self,
        phone: &PhoneNumber,
        url: &str,
        extension: &str,
    ) -> Result<(), ApplicationError>;
}
