//! In-process backend, used when no persistent store is reachable

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{IdentityStore, RatingStore};
use crate::models::{Rating, Score};
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashSet<String>>,
    ratings: RwLock<HashMap<(String, String), Rating>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn exists(&self, username: &str) -> Result<bool> {
        Ok(self.users.read().await.contains(username))
    }

    async fn create(&self, username: &str) -> Result<()> {
        if self.users.write().await.insert(username.to_string()) {
            Ok(())
        } else {
            Err(Error::DuplicateUser(username.to_string()))
        }
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn ratings_for(&self, user: &str) -> Result<HashSet<String>> {
        Ok(self
            .ratings
            .read()
            .await
            .keys()
            .filter(|(u, _)| u == user)
            .map(|(_, image)| image.clone())
            .collect())
    }

    async fn upsert(&self, user: &str, image: &str, score: Score) -> Result<()> {
        let rating = Rating {
            user: user.to_string(),
            image: image.to_string(),
            score,
            rated_at: Utc::now(),
        };
        self.ratings
            .write()
            .await
            .insert((user.to_string(), image.to_string()), rating);
        Ok(())
    }

    async fn rating(&self, user: &str, image: &str) -> Result<Option<Rating>> {
        Ok(self
            .ratings
            .read()
            .await
            .get(&(user.to_string(), image.to_string()))
            .cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.ratings.read().await.len() as u64)
    }
}
