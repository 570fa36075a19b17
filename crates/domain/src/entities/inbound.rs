//! Canonical shape of an inbound gateway message
//!
//! The gateway delivers a different payload per content category; the
//! normalizer collapses all of them into `NormalizedMessage` before the
//! relay pipeline runs.

use serde::{Deserialize, Serialize};

/// Content category of a relayed media attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    Video,
    Document,
    Sticker,
}

/// A downloadable media resource attached to an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    /// Remote URL the bytes can be fetched from
    pub url: String,
    /// Filename presented to the inbox platform
    pub filename: String,
    /// MIME type presented to the inbox platform
    pub mime_type: String,
    /// Content category the attachment was classified as
    pub kind: MediaKind,
}

/// One inbound message reduced to text plus an optional attachment
///
/// Invariant: at least one of `text` / `attachment` is non-empty; the
/// constructor refuses the all-empty combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Message text or media caption (may be empty when an attachment
    /// is present)
    pub text: String,
    /// Attachment to relay, if the message carried media
    pub attachment: Option<MediaAttachment>,
}

impl NormalizedMessage {
    /// Build a normalized message, rejecting the empty combination
    pub fn new(text: impl Into<String>, attachment: Option<MediaAttachment>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() && attachment.is_none() {
            return None;
        }
        Some(Self { text, attachment })
    }

    /// Whether the message carries a media attachment
    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> MediaAttachment {
        MediaAttachment {
            url: "https://media.example/abc".to_string(),
            filename: "image.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            kind: MediaKind::Image,
        }
    }

    #[test]
    fn text_only_message_is_valid() {
        let msg = NormalizedMessage::new("Hello", None).unwrap();
        assert_eq!(msg.text, "Hello");
        assert!(!msg.has_attachment());
    }

    #[test]
    fn attachment_only_message_is_valid() {
        let msg = NormalizedMessage::new("", Some(attachment())).unwrap();
        assert!(msg.text.is_empty());
        assert!(msg.has_attachment());
    }

    #[test]
    fn empty_message_is_rejected() {
        assert!(NormalizedMessage::new("", None).is_none());
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        assert!(NormalizedMessage::new("   ", None).is_none());
    }

    #[test]
    fn caption_and_attachment_both_survive() {
        let msg = NormalizedMessage::new("caption", Some(attachment())).unwrap();
        assert_eq!(msg.text, "caption");
        assert_eq!(msg.attachment.unwrap().kind, MediaKind::Image);
    }

    #[test]
    fn media_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MediaKind::Document).unwrap();
        assert_eq!(json, "\"document\"");
    }
}
