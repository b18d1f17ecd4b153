//! Document store layer for Rondo
//!
//! The client never owns domain data: an external document store is the
//! single source of truth, written through [`CollectionStore`] and read
//! back through live [`Subscription`] snapshots. [`LocalStore`] is the
//! bundled SQLite implementation of the same contract.

mod document;
mod error;
mod local;
mod migrations;
mod parse;
mod subscription;
mod traits;
mod write;

pub use document::{Document, DocumentId, DOCUMENT_ID_LEN};
pub use error::StoreError;
pub use local::LocalStore;
pub use subscription::{Direction, OrderBy, Subscription, FIELD_CREATED_AT, FIELD_UPDATED_AT};
pub use traits::CollectionStore;
pub use write::WriteOp;
