//! Identity resolution - phone number to source identity
//!
//! Maps an external phone number onto the inbox platform's
//! contact-inbox link via idempotent create-then-reconcile. The create
//! endpoint is the cheapest way to get a channel-scoped identity but
//! races under concurrent webhook delivery for the same phone; the
//! conflict branch reconciles without any local locking.

use std::sync::Arc;

use domain::PhoneNumber;
use tracing::{debug, instrument};

use crate::error::ApplicationError;
use crate::ports::{ContactCreateOutcome, InboxPort, SourceId};

/// How a source identity was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The contact did not exist; it was created together with its
    /// channel link
    Created(SourceId),
    /// The phone was already registered; the existing (or freshly
    /// linked) identity is reused
    FoundExisting(SourceId),
}

impl Resolution {
    /// The resolved source identity, however it was obtained
    pub fn source_id(&self) -> &SourceId {
        match self {
            Self::Created(id) | Self::FoundExisting(id) => id,
        }
    }
}

/// Resolves phone numbers to source identities on the inbox platform
pub struct IdentityResolver {
    inbox: Arc<dyn InboxPort>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl IdentityResolver {
    /// Create a resolver over an inbox port
    pub fn new(inbox: Arc<dyn InboxPort>) -> Self {
        Self { inbox }
    }

    /// Resolve a phone number to a source identity, creating the
    /// contact and/or channel link when missing
    ///
    /// Fail-closed: any failure other than the expected phone-taken
    /// conflict propagates, and the caller aborts the event's pipeline
    /// rather than guessing an identity.
    #[instrument(skip(self), fields(phone = %phone))]
    pub async fn resolve(
        &self,
        phone: &PhoneNumber,
        display_name: &str,
    ) -> Result<Resolution, ApplicationError> {
        match self.inbox.create_contact(phone, display_name).await? {
            ContactCreateOutcome::Created(source_id) => {
                debug!(%source_id, "Contact created");
                Ok(Resolution::Created(source_id))
            }
            ContactCreateOutcome::PhoneTaken => self.reconcile(phone).await,
        }
    }

    /// Conflict branch: look the contact up and reuse or complete its
    /// channel link
    async fn reconcile(&self, phone: &PhoneNumber) -> Result<Resolution, ApplicationError> {
        let found = self.inbox.search_contact(phone).await?.ok_or_else(|| {
            ApplicationError::ExternalService(format!(
                "Contact for {phone} reported as taken but not found by search"
            ))
        })?;

        if let Some(source_id) = found.channel_link {
            debug!(%source_id, "Reusing existing channel link");
            return Ok(Resolution::FoundExisting(source_id));
        }

        let source_id = self.inbox.create_contact_inbox(found.contact_id).await?;
        debug!(%source_id, contact_id = found.contact_id, "Created missing channel link");
        Ok(Resolution::FoundExisting(source_id))
    }
}
