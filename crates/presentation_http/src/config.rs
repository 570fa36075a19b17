//! Application configuration
//!
//! Loaded once at startup from an optional `config` file overridden by
//! `BRIDGE__`-prefixed environment variables, then injected into the
//! services. Nothing reloads at runtime.

use std::time::Duration;

use application::RelayPolicy;
use secrecy::SecretString;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Messaging gateway credentials
    pub gateway: GatewaySettings,
    /// Support inbox credentials
    pub inbox: InboxSettings,
    /// Labeling and pacing policy for relayed conversations
    #[serde(default)]
    pub relay: RelaySettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_secs: None,
        }
    }
}

/// Messaging gateway credentials
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,
    pub instance_id: String,
    pub instance_token: SecretString,
    /// Account-level security token, required by some installations
    #[serde(default)]
    pub client_token: Option<SecretString>,
}

fn default_gateway_base_url() -> String {
    "https://api.z-api.io".to_string()
}

/// Support inbox credentials
#[derive(Debug, Clone, Deserialize)]
pub struct InboxSettings {
    pub base_url: String,
    pub access_token: SecretString,
    pub account_id: u64,
    pub inbox_id: u64,
}

/// Labeling and pacing policy for relayed conversations
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub workflow_label: String,
    pub human_labels: Vec<String>,
    pub settle_delay_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        let policy = RelayPolicy::default();
        Self {
            workflow_label: policy.workflow_label,
            human_labels: policy.human_labels,
            settle_delay_ms: u64::try_from(policy.settle_delay.as_millis()).unwrap_or(400),
        }
    }
}

impl RelaySettings {
    /// Convert into the relay policy consumed by the application layer
    pub fn to_policy(&self) -> RelayPolicy {
        RelayPolicy {
            workflow_label: self.workflow_label.clone(),
            human_labels: self.human_labels.clone(),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("gateway.base_url", default_gateway_base_url())?
            .set_default("relay.workflow_label", "workflow")?
            .set_default("relay.human_labels", vec!["agent-off", "manager"])?
            .set_default("relay.settle_delay_ms", 400)?
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., BRIDGE__SERVER__PORT)
            .add_source(
                config::Environment::with_prefix("BRIDGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// Repair the base URLs operators paste into the environment: strip
/// trailing slashes, collapse a doubled scheme, default to https
pub fn sanitize_base_url(raw: &str) -> String {
    let mut url = raw.trim().trim_end_matches('/').to_string();

    loop {
        let inner = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        match inner {
            Some(rest) if rest.starts_with("https://") || rest.starts_with("http://") => {
                url = rest.to_string();
            }
            _ => break,
        }
    }

    if !url.starts_with("https://") && !url.starts_with("http://") {
        url = format!("https://{url}");
    }

    url
}
