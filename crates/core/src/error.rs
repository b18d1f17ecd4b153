//! Error types for Rondo Core

use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by the scheduling operations.
///
/// Validation variants are detected synchronously against the last
/// observed snapshot, before any store call is attempted. Store and
/// identity-provider failures arrive as [`Error::StoreUnavailable`]
/// with the underlying message attached.
#[derive(Error, Debug)]
pub enum Error {
    #[error("You must be signed in to {0}.")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    AlreadyMember(String),

    #[error("{0}")]
    NotMember(String),

    #[error("This game is already full.")]
    Full,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
