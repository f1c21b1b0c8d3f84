//! # Face Rating Common Library
//!
//! Core of the face rating service, independent of the HTTP layer:
//! - Image catalog (the folder of images to rate)
//! - Identity and rating stores (SQLite, with in-memory fallback)
//! - Per-visitor session context
//! - Rating workflow (login, register, rate, skip, logout, progress)
//! - Configuration resolution

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod workflow;

pub use catalog::ImageCatalog;
pub use error::{Error, Result};
pub use models::{Progress, Rating, Score};
pub use session::SessionContext;
pub use store::{IdentityStore, RatingStore, Storage};
pub use workflow::{RatingWorkflow, Screen, Step, View};
