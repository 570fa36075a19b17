//! Canonical shape of an agent reply leaving the inbox platform

use serde::{Deserialize, Serialize};

use crate::value_objects::PhoneNumber;

/// Content category reported by the inbox platform for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentCategory {
    Image,
    Audio,
    Video,
    /// Anything the inbox platform does not classify as image, audio
    /// or video (it reports these as "file")
    Other,
}

impl AttachmentCategory {
    /// Map the inbox platform's `file_type` string onto a category
    pub fn from_file_type(file_type: &str) -> Self {
        match file_type.to_ascii_lowercase().as_str() {
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            _ => Self::Other,
        }
    }
}

/// One attachment carried by an agent reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAttachment {
    /// Download URL published by the inbox platform
    pub url: String,
    /// Content category
    pub category: AttachmentCategory,
}

impl ReplyAttachment {
    /// Best-effort file extension guessed from the URL path
    ///
    /// Falls back to `bin` when the path has no recognizable extension.
    pub fn extension_guess(&self) -> String {
        let path = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default();

        match path.rsplit_once('.') {
            Some((stem, ext))
                if !stem.is_empty()
                    && !ext.is_empty()
                    && ext.len() <= 5
                    && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext.to_ascii_lowercase()
            }
            _ => "bin".to_string(),
        }
    }
}

/// An agent reply ready for dispatch to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    /// Destination phone number
    pub phone: PhoneNumber,
    /// Reply text; used as message body or media caption
    pub text: String,
    /// Attachments in the order the inbox platform listed them
    pub attachments: Vec<ReplyAttachment>,
}
