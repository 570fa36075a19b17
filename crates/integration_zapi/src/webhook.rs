//! Z-API webhook payload and the payload normalizer
//!
//! The gateway delivers one callback per message with a different
//! sibling object per content category. Despite a message nominally
//! having one type, more than one field can be populated; the
//! normalizer picks one deterministically.

use domain::{MediaAttachment, MediaKind, NormalizedMessage};
use serde::Deserialize;
use tracing::debug;

/// Callback type the gateway uses for received messages
const RECEIVED_CALLBACK: &str = "ReceivedCallback";

/// One inbound gateway callback
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    /// Callback type; anything but a received message is dropped
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Group chats are out of scope
    #[serde(default, rename = "isGroup")]
    pub is_group: bool,
    /// Echoes of our own sends are dropped
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
    /// Sender phone number
    pub phone: Option<String>,
    /// Sender display name
    #[serde(rename = "senderName")]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub text: Option<TextPayload>,
    #[serde(default)]
    pub audio: Option<AudioPayload>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub document: Option<DocumentPayload>,
    #[serde(default)]
    pub video: Option<VideoPayload>,
    #[serde(default)]
    pub sticker: Option<StickerPayload>,
}

/// Text arrives either as a bare string or wrapped in an object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextPayload {
    Plain(String),
    Structured { message: String },
}

impl TextPayload {
    /// The extracted message text, whatever the wire shape was
    pub fn message(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Structured { message: text } => text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioPayload {
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPayload {
    #[serde(rename = "documentUrl")]
    pub document_url: String,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoPayload {
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StickerPayload {
    #[serde(rename = "stickerUrl")]
    pub sticker_url: String,
}

/// Display name for the sender, falling back to the phone number
pub fn sender_display_name(event: &InboundEvent) -> String {
    event
        .sender_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| event.phone.clone())
        .unwrap_or_default()
}

/// Normalize one callback into the canonical message shape
///
/// Returns `None` for anything that must not be relayed: status
/// callbacks, group chats, echoes of our own messages, payloads with
/// no recognizable content. That is a filter, not an error.
///
/// Precedence when several content fields are populated:
/// text > audio > image > document > video > sticker. A field that is
/// present but empty does not win; the next category is tried.
pub fn normalize(event: &InboundEvent) -> Option<NormalizedMessage> {
    if event.event_type.as_deref() != Some(RECEIVED_CALLBACK) {
        debug!(event_type = ?event.event_type, "Dropping non-message callback");
        return None;
    }
    if event.is_group {
        debug!("Dropping group message");
        return None;
    }
    if event.from_me {
        debug!("Dropping echo of own message");
        return None;
    }

    if let Some(text) = &event.text {
        let message = text.message();
        if !message.is_empty() {
            return NormalizedMessage::new(message, None);
        }
    }

    if let Some(audio) = event.audio.as_ref().filter(|a| !a.audio_url.is_empty()) {
        // The gateway supports no caption on audio; a placeholder
        // filename stands in for the one it never sends.
        let attachment = MediaAttachment {
            url: audio.audio_url.clone(),
            filename: "audio.ogg".to_string(),
            mime_type: "audio/ogg".to_string(),
            kind: MediaKind::Audio,
        };
        return NormalizedMessage::new("", Some(attachment));
    }

    if let Some(image) = event.image.as_ref().filter(|i| !i.image_url.is_empty()) {
        let attachment = MediaAttachment {
            url: image.image_url.clone(),
            filename: "image.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            kind: MediaKind::Image,
        };
        return NormalizedMessage::new(image.caption.clone().unwrap_or_default(), Some(attachment));
    }

    if let Some(document) = event
        .document
        .as_ref()
        .filter(|d| !d.document_url.is_empty())
    {
        let filename = document
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "document".to_string());
        let attachment = MediaAttachment {
            mime_type: document_mime(&filename).to_string(),
            url: document.document_url.clone(),
            filename,
            kind: MediaKind::Document,
        };
        return NormalizedMessage::new(
            document.caption.clone().unwrap_or_default(),
            Some(attachment),
        );
    }

    if let Some(video) = event.video.as_ref().filter(|v| !v.video_url.is_empty()) {
        let attachment = MediaAttachment {
            url: video.video_url.clone(),
            filename: "video.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            kind: MediaKind::Video,
        };
        return NormalizedMessage::new(video.caption.clone().unwrap_or_default(), Some(attachment));
    }

    if let Some(sticker) = event
        .sticker
        .as_ref()
        .filter(|s| !s.sticker_url.is_empty())
    {
        let attachment = MediaAttachment {
            url: sticker.sticker_url.clone(),
            filename: "sticker.webp".to_string(),
            mime_type: "image/webp".to_string(),
            kind: MediaKind::Sticker,
        };
        return NormalizedMessage::new("", Some(attachment));
    }

    debug!("Dropping callback with no recognizable content");
    None
}

/// MIME type inferred from a document filename's extension
fn document_mime(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
