use crate::domain::{WaitlistEmail, WaitlistEntry};
use crate::utils::error_chain_fmt;
use crate::waitlist_repository::{InsertError, WaitlistRepository};
use anyhow::anyhow;
use std::sync::Arc;

/// Everything that can go wrong while registering an email.
///
/// The `Display` representation is what the client gets to see.
#[derive(thiserror::Error)]
pub enum RegisterError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Email already in waitlist")]
    DuplicateEntry,
    #[error("Database error: {0}")]
    StorageError(#[source] anyhow::Error),
}

impl std::fmt::Debug for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Registers emails on the waitlist. Uniqueness is left to the store: two concurrent
/// registrations of the same email race, one wins and the other gets `DuplicateEntry`.
#[derive(Clone)]
pub struct RegistrationService {
    repository: Arc<dyn WaitlistRepository>,
}

impl RegistrationService {
    pub fn new(repository: Arc<dyn WaitlistRepository>) -> Self {
        Self { repository }
    }

    /// Validate `raw_email` and register it. A malformed address never reaches the store.
    pub async fn register(&self, raw_email: &str) -> Result<WaitlistEntry, RegisterError> {
        let email =
            WaitlistEmail::parse(raw_email.to_owned()).map_err(RegisterError::ValidationError)?;
        self.register_email(email).await
    }

    #[tracing::instrument(
        name = "Registering a waitlist entry",
        skip(self, email),
        fields(waitlist_email = %email)
    )]
    pub async fn register_email(
        &self,
        email: WaitlistEmail,
    ) -> Result<WaitlistEntry, RegisterError> {
        let id = self
            .repository
            .insert(&email)
            .await
            .map_err(|e| match e {
                InsertError::Duplicate => RegisterError::DuplicateEntry,
                InsertError::Storage(e) => RegisterError::StorageError(e),
            })?;

        // Read the entry back before answering, so that we only ever hand out ids that the
        // store actually knows about.
        let entry = self
            .repository
            .find_by_id(&id)
            .await
            .map_err(RegisterError::StorageError)?
            .ok_or_else(|| RegisterError::StorageError(anyhow!("insert did not persist")))?;

        tracing::info!(entry_id = %entry.id, "New waitlist entry has been saved");
        Ok(entry)
    }
}
