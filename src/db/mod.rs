mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use strum::{AsRefStr, EnumString};
use tokio::sync::broadcast;

pub type DbStore = Arc<dyn Store>;

/// Stream of change notifications published by a store after each write.
pub type ChangeFeed = BoxStream<'static, Change>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("record not found")]
    NotFound,
    #[error("conflicting record already exists")]
    Conflict,
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Which collection a write touched. Serialized names match the table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Change {
    Submissions,
    Reviews,
    Settings,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn submissions(&self) -> Result<Vec<Submission>, StoreError>;

    async fn reviews(&self) -> Result<Vec<Review>, StoreError>;

    async fn settings(&self) -> Result<Settings, StoreError>;

    async fn create_submission(&self, new: NewSubmission) -> Result<Submission, StoreError>;

    /// Deletes the submission together with all of its reviews.
    async fn delete_submission(&self, id: &str) -> Result<(), StoreError>;

    /// Creates the review and stamps the submission's pickup date as one write.
    /// Fails with [`StoreError::Conflict`] if the reviewer already holds a
    /// review of the submission.
    async fn assign_review(&self, new: NewReview) -> Result<Review, StoreError>;

    /// Marks the review finished and recomputes the parent submission's
    /// review count, status and correction date.
    async fn finish_review(
        &self,
        id: &str,
        correction: ReviewCorrection,
    ) -> Result<Review, StoreError>;

    async fn delete_review(&self, id: &str) -> Result<(), StoreError>;

    async fn save_settings(&self, settings: Settings) -> Result<(), StoreError>;

    /// Removes every review and submission. Settings are kept.
    async fn clear(&self) -> Result<(), StoreError>;

    async fn changes(&self) -> Result<ChangeFeed, StoreError>;
}

/// Adapts a broadcast receiver into a change stream. Lagging receivers skip
/// the notifications they missed and keep going.
pub fn broadcast_feed(receiver: broadcast::Receiver<Change>) -> ChangeFeed {
    futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => return Some((change, receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Change feed lagged, skipped {} notifications", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

/// Opens the store named by `database_url`. `memory:` selects the in-process
/// store, anything else is treated as a PostgreSQL connection string.
pub async fn connect(database_url: &str) -> Result<DbStore, StoreError> {
    if database_url.starts_with("memory:") {
        tracing::warn!("Using in-memory store, data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(database_url).await?;
    store.run_migrations().await?;
    Ok(Arc::new(store))
}
