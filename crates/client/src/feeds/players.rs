//! Player directory feed
//!
//! Unlike games and groups, the directory is only watched while a
//! viewer is signed in. Signing out drops the subscription and empties
//! the published state; signing back in opens a fresh one.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use rondo_core::{CollectionStore, Document, OrderBy, PlayerProfile};

use crate::session::SessionState;

/// Published state of the player directory.
#[derive(Debug, Clone)]
pub struct PlayersState {
    /// Directory entries ordered by display name.
    pub players: Vec<PlayerProfile>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for PlayersState {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Live view of the player directory.
pub struct PlayersFeed {
    state_rx: watch::Receiver<PlayersState>,
    task: JoinHandle<()>,
}

impl PlayersFeed {
    /// Start the gated directory watcher.
    pub fn spawn(
        store: Arc<dyn CollectionStore>,
        session: watch::Receiver<SessionState>,
        collection: impl Into<String>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(PlayersState::default());
        let task = tokio::spawn(players_task(store, collection.into(), session, state_tx));
        Self { state_rx, task }
    }

    /// Current feed state.
    pub fn state(&self) -> PlayersState {
        self.state_rx.borrow().clone()
    }

    /// Watch feed changes.
    pub fn watch(&self) -> watch::Receiver<PlayersState> {
        self.state_rx.clone()
    }
}

impl Drop for PlayersFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn players_task(
    store: Arc<dyn CollectionStore>,
    collection: String,
    mut session: watch::Receiver<SessionState>,
    state_tx: watch::Sender<PlayersState>,
) {
    loop {
        let signed_in = session.borrow_and_update().viewer.is_some();

        if !signed_in {
            let _ = state_tx.send(PlayersState {
                players: Vec::new(),
                loading: false,
                error: None,
            });
            if session.changed().await.is_err() {
                return;
            }
            continue;
        }

        let _ = state_tx.send(PlayersState {
            players: Vec::new(),
            loading: true,
            error: None,
        });

        let mut subscription = match store.subscribe(&collection, OrderBy::ascending("displayName"))
        {
            Ok(subscription) => subscription,
            Err(err) => {
                error!(%collection, error = %err, "Failed to open players subscription");
                let _ = state_tx.send(PlayersState {
                    players: Vec::new(),
                    loading: false,
                    error: Some(err.to_string()),
                });
                if wait_for_sign_out(&mut session).await.is_err() {
                    return;
                }
                continue;
            }
        };

        loop {
            tokio::select! {
                snapshot = subscription.recv() => match snapshot {
                    Ok(docs) => {
                        let _ = state_tx.send(PlayersState {
                            players: decode_players(&docs),
                            loading: false,
                            error: None,
                        });
                    }
                    Err(err) => {
                        error!(%collection, error = %err, "Players subscription failed");
                        let mut state = state_tx.borrow().clone();
                        state.loading = false;
                        state.error = Some(err.to_string());
                        let _ = state_tx.send(state);
                        if wait_for_sign_out(&mut session).await.is_err() {
                            return;
                        }
                        break;
                    }
                },
                changed = session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if session.borrow().viewer.is_none() {
                        break;
                    }
                }
            }
        }
        // Dropping the subscription closes it; the outer loop
        // publishes the signed-out state.
    }
}

async fn wait_for_sign_out(
    session: &mut watch::Receiver<SessionState>,
) -> Result<(), watch::error::RecvError> {
    loop {
        session.changed().await?;
        if session.borrow_and_update().viewer.is_none() {
            return Ok(());
        }
    }
}

fn decode_players(docs: &[Document]) -> Vec<PlayerProfile> {
    docs.iter()
        .filter_map(|doc| match PlayerProfile::from_document(doc) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(id = %doc.id, error = %err, "Skipping malformed player record");
                None
            }
        })
        .collect()
}
