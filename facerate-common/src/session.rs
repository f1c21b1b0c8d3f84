//! Per-visitor session state
//!
//! Owned by the web layer (one per visitor) and passed by value into every
//! workflow action; never stored globally.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Logged-in username; `None` while anonymous
    pub user: Option<String>,
    /// Image currently presented for rating; sticky across redisplays
    pub current_image: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            current_image: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Logout: forget user and held image
    pub fn reset(&mut self) {
        *self = Self::anonymous();
    }
}
