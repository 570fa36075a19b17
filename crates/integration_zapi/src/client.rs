//! Z-API client for sending messages
//!
//! Each content category has its own send endpoint under
//! `instances/{instance}/token/{token}/`.

use std::time::Duration;

use application::{ApplicationError, GatewayPort};
use async_trait::async_trait;
use domain::PhoneNumber;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Z-API errors
#[derive(Debug, Error)]
pub enum ZapiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway API error: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing configuration: {0}")]
    Configuration(String),
}

impl From<ZapiError> for ApplicationError {
    fn from(error: ZapiError) -> Self {
        match error {
            ZapiError::Request(e) => Self::Transport(e.to_string()),
            ZapiError::Api { status, body } => Self::Remote { status, body },
            ZapiError::Configuration(msg) => Self::Configuration(msg),
        }
    }
}

/// Z-API client configuration
#[derive(Debug, Clone)]
pub struct ZapiClientConfig {
    /// API base URL (the hosted default in production, a mock in tests)
    pub base_url: String,
    /// Instance identifier
    pub instance_id: String,
    /// Instance token, part of the endpoint path
    pub instance_token: SecretString,
    /// Account-level Client-Token header, when the account has one
    pub client_token: Option<SecretString>,
}

impl Default for ZapiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.z-api.io".to_string(),
            instance_id: String::new(),
            instance_token: SecretString::from(""),
            client_token: None,
        }
    }
}

/// Client for the Z-API send endpoints
#[derive(Debug, Clone)]
pub struct ZapiClient {
    client: Client,
    config: ZapiClientConfig,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    phone: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SendImageRequest<'a> {
    phone: &'a str,
    image: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    caption: &'a str,
}

#[derive(Debug, Serialize)]
struct SendAudioRequest<'a> {
    phone: &'a str,
    audio: &'a str,
}

#[derive(Debug, Serialize)]
struct SendVideoRequest<'a> {
    phone: &'a str,
    video: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    caption: &'a str,
}

#[derive(Debug, Serialize)]
struct SendDocumentRequest<'a> {
    phone: &'a str,
    document: &'a str,
}

impl ZapiClient {
    /// Create a new Z-API client
    pub fn new(config: ZapiClientConfig) -> Result<Self, ZapiError> {
        if config.base_url.is_empty() {
            return Err(ZapiError::Configuration("base_url is required".to_string()));
        }
        if config.instance_id.is_empty() {
            return Err(ZapiError::Configuration(
                "instance_id is required".to_string(),
            ));
        }
        if config.instance_token.expose_secret().is_empty() {
            return Err(ZapiError::Configuration(
                "instance_token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/instances/{}/token/{}/{operation}",
            self.config.base_url,
            self.config.instance_id,
            self.config.instance_token.expose_secret()
        )
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        operation: &str,
        body: &T,
    ) -> Result<(), ZapiError> {
        let mut request = self.client.post(self.endpoint(operation)).json(body);
        if let Some(token) = &self.config.client_token {
            request = request.header("Client-Token", token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(operation, "Gateway send succeeded");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ZapiError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl GatewayPort for ZapiClient {
    #[instrument(skip(self, message), fields(phone = %phone))]
    async fn send_text(&self, phone: &PhoneNumber, message: &str) -> Result<(), ApplicationError> {
        self.post_json(
            "send-text",
            &SendTextRequest {
                phone: phone.as_str(),
                message,
            },
        )
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, url, caption), fields(phone = %phone))]
    async fn send_image(
        &self,
        phone: &PhoneNumber,
        url: &str,
        caption: &str,
    ) -> Result<(), ApplicationError> {
        self.post_json(
            "send-image",
            &SendImageRequest {
                phone: phone.as_str(),
                image: url,
                caption,
            },
        )
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, url), fields(phone = %phone))]
    async fn send_audio(&self, phone: &PhoneNumber, url: &str) -> Result<(), ApplicationError> {
        self.post_json(
            "send-audio",
            &SendAudioRequest {
                phone: phone.as_str(),
                audio: url,
            },
        )
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, url, caption), fields(phone = %phone))]
    async fn send_video(
        &self,
        phone: &PhoneNumber,
        url: &str,
        caption: &str,
    ) -> Result<(), ApplicationError> {
        self.post_json(
            "send-video",
            &SendVideoRequest {
                phone: phone.as_str(),
                video: url,
                caption,
            },
        )
        .await
        .map_err(Into::into)
    }

    #[instrument(skip(self, url), fields(phone = %phone, extension))]
    async fn send_document(
        &self,
        phone: &PhoneNumber,
        url: &str,
        extension: &str,
    ) -> Result<(), ApplicationError> {
        // The document endpoint carries the file extension in its path.
        self.post_json(
            &format!("send-document/{extension}"),
            &SendDocumentRequest {
                phone: phone.as_str(),
                document: url,
            },
        )
        .await
        .map_err(Into::into)
    }
}
