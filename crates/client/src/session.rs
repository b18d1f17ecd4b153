//! Viewer session
//!
//! A background task follows the identity provider's viewer stream,
//! keeps the player-directory entry fresh on sign-in, and reports auth
//! transitions to the analytics sink. Consumers read the session
//! through a watch channel.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use rondo_core::{CollectionStore, DocumentId, Identity, PlayerProfile, StoreError, UserId};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::auth::{AuthError, IdentityProvider};
use crate::config::CollectionNames;

/// Session state published to consumers.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// The signed-in viewer, if any.
    pub viewer: Option<Identity>,
    /// Set when the player-directory upsert failed. Sign-in itself
    /// still completes.
    pub profile_error: Option<String>,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.viewer.is_some()
    }
}

/// Handle to the session task.
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    state_rx: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl Session {
    /// Start following the provider's viewer stream.
    pub fn spawn(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn CollectionStore>,
        analytics: Arc<dyn AnalyticsSink>,
        collections: &CollectionNames,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let task = tokio::spawn(session_task(
            provider.label(),
            provider.watch(),
            store,
            analytics,
            collections.players.clone(),
            state_tx,
        ));
        Self {
            provider,
            state_rx,
            task,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Watch session changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// The signed-in viewer, if any.
    pub fn viewer(&self) -> Option<Identity> {
        self.state_rx.borrow().viewer.clone()
    }

    /// Run the provider's sign-in flow. The session state updates once
    /// the provider publishes the new viewer.
    pub async fn sign_in(&self) -> Result<Identity, AuthError> {
        self.provider.sign_in().await
    }

    /// Sign the viewer out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn session_task(
    method: &'static str,
    mut provider_rx: watch::Receiver<Option<Identity>>,
    store: Arc<dyn CollectionStore>,
    analytics: Arc<dyn AnalyticsSink>,
    players_collection: String,
    state_tx: watch::Sender<SessionState>,
) {
    let mut last_uid: Option<UserId> = None;

    loop {
        let viewer = provider_rx.borrow_and_update().clone();
        let current_uid = viewer.as_ref().map(|identity| identity.id.clone());

        if current_uid != last_uid {
            match &viewer {
                Some(identity) => {
                    info!(user_id = %identity.id, "Viewer signed in");

                    let mut profile_error = None;
                    let mut first_sign_in = false;
                    match upsert_profile(store.as_ref(), &players_collection, identity).await {
                        Ok(created) => first_sign_in = created,
                        Err(err) => {
                            error!(
                                user_id = %identity.id,
                                error = %err,
                                "Failed to sync player profile"
                            );
                            profile_error =
                                Some("Unable to update your profile information.".to_string());
                        }
                    }

                    analytics.set_user(Some(identity));
                    if first_sign_in {
                        analytics.record(&AnalyticsEvent::SignUp {
                            method: method.to_string(),
                        });
                    } else {
                        analytics.record(&AnalyticsEvent::Login {
                            method: method.to_string(),
                        });
                    }

                    let _ = state_tx.send(SessionState {
                        viewer: viewer.clone(),
                        profile_error,
                    });
                }
                None => {
                    info!("Viewer signed out");
                    analytics.set_user(None);
                    analytics.record(&AnalyticsEvent::Logout);
                    let _ = state_tx.send(SessionState::default());
                }
            }
            last_uid = current_uid;
        }

        if provider_rx.changed().await.is_err() {
            break;
        }
    }
}

/// Write the viewer's directory entry, merging over any existing one.
/// Returns true when the entry did not exist before.
async fn upsert_profile(
    store: &dyn CollectionStore,
    collection: &str,
    identity: &Identity,
) -> Result<bool, StoreError> {
    let id = DocumentId::from(identity.id.as_str());
    let existing = store.get(collection, &id).await?;
    store
        .set(collection, &id, PlayerProfile::record_for(identity), true)
        .await?;
    Ok(existing.is_none())
}
