//! Rondo Core Library
//!
//! Domain model, admission rules, and the document-store layer for the
//! Rondo scheduling client.

pub mod error;
pub mod invariants;
pub mod models;
pub mod policy;
pub mod store;

pub use error::{Error, Result};
pub use models::*;
pub use store::{
    CollectionStore, Direction, Document, DocumentId, LocalStore, OrderBy, StoreError,
    Subscription, WriteOp,
};
