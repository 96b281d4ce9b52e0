use crate::configuration::DatabaseSettings;
use crate::utils::error_chain_fmt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name of the collection holding waitlist entries.
pub const WAITLIST_COLLECTION: &str = "waitlists";

/// MongoDB's `IndexAlreadyExists` server error code.
const INDEX_ALREADY_EXISTS: i32 = 68;

#[derive(thiserror::Error)]
pub enum StartupError {
    #[error("{0} must be set to a non-empty value")]
    MissingSetting(&'static str),
    #[error("Failed to set up the MongoDB client")]
    Connect(#[source] mongodb::error::Error),
    #[error("Failed to create the unique index on `waitlists.email`")]
    CreateIndex(#[source] mongodb::error::Error),
}

impl std::fmt::Debug for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Shared handle on the document store.
///
/// It is created once, before the server starts accepting requests, and cloned into every
/// component that needs storage access. Clones share the underlying connection pool and the
/// ready/closed state, so `shutdown` on any clone closes them all.
#[derive(Clone, Debug)]
pub struct Persistence {
    client: Client,
    database: Database,
    closed: Arc<AtomicBool>,
}

impl Persistence {
    /// Build the client and make sure the uniqueness constraint on `email` is in place.
    /// Any error here is fatal: the application must not start serving.
    #[tracing::instrument(
        name = "Initialising the persistence handle",
        skip(settings),
        fields(database_name = %settings.database_name)
    )]
    pub async fn initialize(settings: &DatabaseSettings) -> Result<Self, StartupError> {
        let persistence = Self::connect_lazy(settings).await?;
        persistence.ensure_indexes().await?;
        Ok(persistence)
    }

    /// Build the client without talking to the server. The driver connects on first use.
    pub async fn connect_lazy(settings: &DatabaseSettings) -> Result<Self, StartupError> {
        if settings.url.expose_secret().trim().is_empty() {
            return Err(StartupError::MissingSetting("MONGO_DB_URL"));
        }
        if settings.database_name.trim().is_empty() {
            return Err(StartupError::MissingSetting("MONGO_DB_NAME"));
        }

        let mut options = ClientOptions::parse(settings.url.expose_secret().as_str())
            .await
            .map_err(StartupError::Connect)?;
        options.server_selection_timeout = Some(settings.server_selection_timeout());

        let client = Client::with_options(options).map_err(StartupError::Connect)?;
        let database = client.database(&settings.database_name);

        Ok(Self {
            client,
            database,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    #[tracing::instrument(name = "Ensuring the waitlist indexes exist", skip(self))]
    pub async fn ensure_indexes(&self) -> Result<(), StartupError> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // Re-creating an identical index is a no-op server side, 68 only shows up with older
        // servers or concurrent creation.
        match self
            .database
            .collection::<Document>(WAITLIST_COLLECTION)
            .create_index(index)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_index_already_exists(&e) => {
                tracing::info!("The unique index on `email` already exists");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to create the unique index");
                Err(StartupError::CreateIndex(e))
            }
        }
    }

    /// Typed access to the waitlist collection.
    pub fn waitlists<T: Send + Sync>(&self) -> Collection<T> {
        self.database.collection::<T>(WAITLIST_COLLECTION)
    }

    pub fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Release the connection pool. Calling it more than once is harmless.
    #[tracing::instrument(name = "Shutting down the persistence handle", skip(self))]
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("The persistence handle was already closed");
            return;
        }
        self.client.clone().shutdown().await;
        tracing::info!("The persistence handle is closed");
    }
}

fn is_index_already_exists(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Command(command_error) if command_error.code == INDEX_ALREADY_EXISTS
    )
}
