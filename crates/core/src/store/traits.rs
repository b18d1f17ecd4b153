//! Store contract trait
//!
//! The seam between the scheduling client and whichever document store
//! backs it. Implementations are injected into the client explicitly;
//! tests substitute [`LocalStore`](super::LocalStore) or a fake.

use async_trait::async_trait;
use serde_json::Value;

use super::document::{Document, DocumentId};
use super::error::StoreError;
use super::subscription::{OrderBy, Subscription};
use super::write::WriteOp;

/// The authoritative document store behind the client.
///
/// The store is the sole source of truth: every mutation is a write
/// here, and reads arrive back through [`subscribe`](Self::subscribe)
/// as full ordered snapshots. Ids and timestamps are store-assigned;
/// `createdAt` is strictly monotonic within one store instance.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert a new document with a store-assigned id.
    async fn create(&self, collection: &str, data: Value) -> Result<DocumentId, StoreError>;

    /// Write a document at a caller-chosen id, creating it when absent.
    ///
    /// With `merge` the given top-level fields overlay the existing
    /// data (shallow); otherwise the data replaces it wholesale. The
    /// `createdAt` stamp of an existing document is preserved.
    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Apply field mutations to an existing document, atomically and in
    /// order. Fails with [`StoreError::MissingDocument`] when the
    /// document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        ops: Vec<WriteOp>,
    ) -> Result<(), StoreError>;

    /// Remove a document. Removing an absent document is not an error.
    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError>;

    /// Fetch a single document.
    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Open a live snapshot stream over a collection.
    ///
    /// The subscription's first `recv` yields the current contents.
    /// Failures after this call surface through `recv` as a persistent
    /// [`StoreError::SubscriptionClosed`].
    fn subscribe(&self, collection: &str, order: OrderBy) -> Result<Subscription, StoreError>;
}
