//! Store-level error type

use thiserror::Error;

/// Failures raised by a [`CollectionStore`](super::CollectionStore)
/// implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No document '{id}' in collection '{collection}'")]
    MissingDocument { collection: String, id: String },

    #[error("Document data must be a JSON object")]
    NotAnObject,

    #[error("Field '{0}' is not an array")]
    NotAnArray(String),

    #[error("Subscription closed")]
    SubscriptionClosed,

    #[error("Backend error: {0}")]
    Backend(String),
}
