//! Identity and rating persistence
//!
//! Two contracts, [`IdentityStore`] and [`RatingStore`], with a persistent
//! SQLite backend and a transient in-memory backend. [`Storage::open`] picks
//! the backend for a process and degrades to memory when the configured store
//! cannot be reached, so a broken database never silently drops ratings
//! without the visitor being told.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{Rating, Score};
use crate::Result;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store URL that selects the in-memory backend explicitly
pub const MEMORY_STORE_URL: &str = "memory";

/// Registered usernames
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn exists(&self, username: &str) -> Result<bool>;

    /// Fails with [`crate::Error::DuplicateUser`] if the username is present
    async fn create(&self, username: &str) -> Result<()>;
}

/// Ratings keyed by (user, image); at most one record per pair
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Images already rated by `user`
    async fn ratings_for(&self, user: &str) -> Result<HashSet<String>>;

    /// Insert, or replace score and timestamp of the existing record.
    /// Returns only once the write is durable for the backend.
    async fn upsert(&self, user: &str, image: &str, score: Score) -> Result<()>;

    async fn rating(&self, user: &str, image: &str) -> Result<Option<Rating>>;

    /// Total records across all users
    async fn count(&self) -> Result<u64>;
}

/// The backends serving one process
#[derive(Clone)]
pub struct Storage {
    pub identities: Arc<dyn IdentityStore>,
    pub ratings: Arc<dyn RatingStore>,
    /// False when ratings only live for the lifetime of this process
    pub persistent: bool,
    /// Human readable backend description for logs
    pub backend: String,
}

impl Storage {
    /// Build storage from a single store implementing both contracts
    pub fn from_store<S>(store: Arc<S>, persistent: bool, backend: impl Into<String>) -> Self
    where
        S: IdentityStore + RatingStore + 'static,
    {
        Self {
            identities: store.clone(),
            ratings: store,
            persistent,
            backend: backend.into(),
        }
    }

    pub fn memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()), false, "in-memory")
    }

    /// Connect the configured store, falling back to memory when allowed
    pub async fn open(url: &str, allow_fallback: bool) -> Result<Self> {
        if url == MEMORY_STORE_URL {
            warn!("Using in-memory rating store: ratings are lost on restart");
            return Ok(Self::memory());
        }

        match SqliteStore::connect(url).await {
            Ok(store) => {
                info!("Connected to rating store {}", url);
                Ok(Self::from_store(Arc::new(store), true, url))
            }
            Err(e) if allow_fallback => {
                warn!("Failed to connect to rating store {}: {}", url, e);
                warn!("Falling back to in-memory rating store: ratings are lost on restart");
                Ok(Self::memory())
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("persistent", &self.persistent)
            .field("backend", &self.backend)
            .finish()
    }
}
