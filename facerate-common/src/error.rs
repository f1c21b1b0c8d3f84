//! Error taxonomy for face rating
//!
//! Every variant carries a message that can be shown to the visitor as-is.
//! The workflow catches these at the boundary of the action that raised them.

use thiserror::Error;

/// Common result type for face rating operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the catalog, the stores and the rating workflow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Wrong shared password, or unknown username at login
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Registration asked for a username that already exists
    #[error("Username already taken")]
    UsernameTaken,

    /// Registration with an empty (or whitespace-only) username
    #[error("Please enter a username")]
    EmptyUsername,

    /// Identity store refused to create an existing user
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// Any I/O failure of the identity or rating store
    #[error("Rating store unavailable: {0}")]
    StoreUnavailable(String),

    /// Image folder missing or unreadable
    #[error("Image catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Action requires a logged-in visitor
    #[error("Please log in first")]
    NotAuthenticated,

    /// Score outside 1..=10, or not a whole number at all
    #[error("Rating must be between 1 and 10, got '{0}'")]
    InvalidScore(String),

    /// Rating submitted while no image is being presented
    #[error("No image is currently being rated")]
    NothingToRate,

    /// Rating submitted for an image other than the one being presented
    #[error("This rating was for {submitted}, but {expected} is being shown; please rate again")]
    StaleSubmission { expected: String, submitted: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}
