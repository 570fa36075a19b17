//! Z-API integration
//!
//! WhatsApp gateway adapter: webhook payload types with the payload
//! normalizer, and the REST client for the per-category send
//! endpoints.

pub mod client;
pub mod webhook;

pub use client::{ZapiClient, ZapiClientConfig, ZapiError};
pub use webhook::{InboundEvent, normalize, sender_display_name};
