use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::db::{Change, DbStore, Review, Settings, StoreError, Submission};

/// Point-in-time copy of everything the pages render from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub submissions: Vec<Submission>,
    pub reviews: Vec<Review>,
    pub settings: Settings,
}

impl Snapshot {
    pub fn submission(&self, id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.id == id)
    }

    pub fn review(&self, id: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == id)
    }

    pub fn reviews_of<'a>(&'a self, submission_id: &'a str) -> impl Iterator<Item = &'a Review> {
        self.reviews
            .iter()
            .filter(move |r| r.submission_id == submission_id)
    }

    /// The part of the snapshot a non-administrator may see: their own
    /// submissions, the reviews of them, and the reviews they hold.
    pub fn visible_to(&self, email: &str) -> Snapshot {
        let submissions: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|s| s.author == email)
            .cloned()
            .collect();
        let reviews = self
            .reviews
            .iter()
            .filter(|r| r.reviewer == email || submissions.iter().any(|s| s.id == r.submission_id))
            .cloned()
            .collect();

        Snapshot {
            submissions,
            reviews,
            settings: self.settings,
        }
    }
}

/// In-memory mirror of the store, reloaded whenever the store reports a
/// change. The store stays authoritative: nothing is written here except what
/// was read back from it.
pub struct LiveCache {
    store: DbStore,
    snapshot: RwLock<Snapshot>,
    events: broadcast::Sender<Change>,
    /// Held from the store read until the snapshot is updated, so an older
    /// read never replaces a newer one.
    reload: Mutex<()>,
}

impl LiveCache {
    pub fn new(store: DbStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            store,
            snapshot: RwLock::new(Snapshot::default()),
            events,
            reload: Mutex::new(()),
        })
    }

    /// Subscribes to the store's change feed, loads the initial snapshot and
    /// keeps it current in a background task.
    pub async fn start(store: DbStore) -> Result<(Arc<Self>, JoinHandle<()>), StoreError> {
        let cache = Self::new(store);
        let mut feed = cache.store.changes().await?;
        cache.refresh_all().await?;

        let watcher = cache.clone();
        let handle = tokio::spawn(async move {
            while let Some(change) = feed.next().await {
                if let Err(e) = watcher.refresh(change).await {
                    tracing::error!("Failed to reload {}: {}", change.as_ref(), e);
                }
            }
            tracing::warn!("Store change feed closed, live updates stopped");
        });

        Ok((cache, handle))
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.events.subscribe()
    }

    pub async fn refresh(&self, change: Change) -> Result<(), StoreError> {
        let _reload = self.reload.lock().await;

        match change {
            Change::Submissions => {
                let submissions = self.store.submissions().await?;
                self.snapshot.write().await.submissions = submissions;
            }
            Change::Reviews => {
                let reviews = self.store.reviews().await?;
                self.snapshot.write().await.reviews = reviews;
            }
            Change::Settings => {
                let settings = self.store.settings().await?;
                self.snapshot.write().await.settings = settings;
            }
        }

        tracing::debug!("Reloaded {}", change.as_ref());
        // Nobody listening is fine.
        let _ = self.events.send(change);
        Ok(())
    }

    pub async fn refresh_all(&self) -> Result<(), StoreError> {
        for change in [Change::Settings, Change::Submissions, Change::Reviews] {
            self.refresh(change).await?;
        }
        Ok(())
    }
}
