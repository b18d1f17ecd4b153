//! Identity provider seam
//!
//! Authentication is an external collaborator: the client consumes a
//! readonly stream of the current viewer plus sign-in and sign-out
//! entry points, and never verifies credentials itself.

use async_trait::async_trait;
use tokio::sync::watch;

use rondo_core::Identity;

/// Error type for identity provider calls
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Sign in was unsuccessful. Please try again.")]
    SignInFailed,

    #[error("Sign out was unsuccessful. Please try again.")]
    SignOutFailed,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// External source of the signed-in viewer.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Watch the current viewer; `None` while signed out. The receiver
    /// starts at the provider's current value.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    /// Run the provider's interactive sign-in flow.
    async fn sign_in(&self) -> Result<Identity, AuthError>;

    /// Clear the current viewer.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Short name of the backing method, reported with auth events.
    fn label(&self) -> &'static str {
        "external"
    }
}

/// Deterministic provider for tests and offline use: `sign_in` always
/// yields the preconfigured identity.
pub struct StaticIdentityProvider {
    identity: Identity,
    tx: watch::Sender<Option<Identity>>,
}

impl StaticIdentityProvider {
    /// Provider that starts signed out.
    pub fn new(identity: Identity) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { identity, tx }
    }

    /// Provider that starts with its identity already signed in.
    pub fn signed_in(identity: Identity) -> Self {
        let (tx, _rx) = watch::channel(Some(identity.clone()));
        Self { identity, tx }
    }

    /// Push a viewer change from outside the sign-in/out entry points,
    /// as an external auth backend would.
    pub fn publish(&self, viewer: Option<Identity>) {
        self.tx.send_replace(viewer);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    async fn sign_in(&self) -> Result<Identity, AuthError> {
        self.tx.send_replace(Some(self.identity.clone()));
        Ok(self.identity.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.tx.send_replace(None);
        Ok(())
    }

    fn label(&self) -> &'static str {
        "static"
    }
}
