use crate::domain::{EntryId, WaitlistEmail, WaitlistEntry};
use crate::persistence::Persistence;
use crate::utils::error_chain_fmt;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};

/// MongoDB's `DuplicateKey` server error code.
const DUPLICATE_KEY: i32 = 11000;

/// Outcome of an insertion that did not go through.
#[derive(thiserror::Error)]
pub enum InsertError {
    #[error("An entry with the same email already exists")]
    Duplicate,
    #[error(transparent)]
    Storage(anyhow::Error),
}

impl std::fmt::Debug for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// The waitlist collection. Nothing else reads or writes it.
#[async_trait]
pub trait WaitlistRepository: Send + Sync {
    async fn insert(&self, email: &WaitlistEmail) -> Result<EntryId, InsertError>;
    async fn find_by_id(&self, id: &EntryId) -> Result<Option<WaitlistEntry>, anyhow::Error>;
}

/// A waitlist entry as stored: `{_id, email}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WaitlistDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    email: String,
}

pub struct MongoWaitlistRepository {
    persistence: Persistence,
}

impl MongoWaitlistRepository {
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    fn ensure_ready(&self) -> Result<(), anyhow::Error> {
        if self.persistence.is_ready() {
            Ok(())
        } else {
            Err(anyhow!("the persistence handle is closed"))
        }
    }
}

#[async_trait]
impl WaitlistRepository for MongoWaitlistRepository {
    #[tracing::instrument(name = "Saving new waitlist entry in the database", skip(self, email))]
    async fn insert(&self, email: &WaitlistEmail) -> Result<EntryId, InsertError> {
        self.ensure_ready().map_err(InsertError::Storage)?;

        let document = WaitlistDocument {
            id: None,
            email: email.as_ref().to_owned(),
        };
        let result = self
            .persistence
            .waitlists::<WaitlistDocument>()
            .insert_one(&document)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    InsertError::Duplicate
                } else {
                    tracing::error!(error.cause_chain = ?e, "Failed to insert waitlist entry");
                    InsertError::Storage(e.into())
                }
            })?;

        result
            .inserted_id
            .as_object_id()
            .map(EntryId::from)
            .ok_or_else(|| {
                InsertError::Storage(anyhow!(
                    "the store assigned an unexpected identifier: {}",
                    result.inserted_id
                ))
            })
    }

    #[tracing::instrument(name = "Fetching a waitlist entry by id", skip(self))]
    async fn find_by_id(&self, id: &EntryId) -> Result<Option<WaitlistEntry>, anyhow::Error> {
        self.ensure_ready()?;

        let Some(document) = self
            .persistence
            .waitlists::<WaitlistDocument>()
            .find_one(doc! { "_id": id.as_object_id() })
            .await?
        else {
            return Ok(None);
        };

        // The email was validated on the way in, failing here means someone else wrote to the
        // collection.
        let email = WaitlistEmail::parse(document.email)
            .map_err(|e| anyhow!(e))
            .context("Stored waitlist entry holds an invalid email")?;

        Ok(Some(WaitlistEntry { id: *id, email }))
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
