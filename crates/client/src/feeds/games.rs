//! Games feed and operations

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use rondo_core::{
    available_games, invariants, joined_games, policy, CollectionStore, Document, DocumentId,
    Error, Game, GameDraft, Identity, OrderBy, Participant, Result, WriteOp,
};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::session::SessionState;

/// Published state of the games collection.
#[derive(Debug, Clone)]
pub struct GamesState {
    /// All games, ordered by start time.
    pub games: Vec<Game>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for GamesState {
    fn default() -> Self {
        Self {
            games: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Live view of every scheduled game, plus the operations that mutate
/// the collection.
pub struct GamesFeed {
    store: Arc<dyn CollectionStore>,
    session: watch::Receiver<SessionState>,
    analytics: Arc<dyn AnalyticsSink>,
    collection: String,
    state_rx: watch::Receiver<GamesState>,
    task: JoinHandle<()>,
}

impl GamesFeed {
    /// Start watching the games collection.
    pub fn spawn(
        store: Arc<dyn CollectionStore>,
        session: watch::Receiver<SessionState>,
        analytics: Arc<dyn AnalyticsSink>,
        collection: impl Into<String>,
    ) -> Self {
        let collection = collection.into();
        let (state_tx, state_rx) = watch::channel(GamesState::default());
        let task = tokio::spawn(games_task(store.clone(), collection.clone(), state_tx));
        Self {
            store,
            session,
            analytics,
            collection,
            state_rx,
            task,
        }
    }

    /// Current feed state.
    pub fn state(&self) -> GamesState {
        self.state_rx.borrow().clone()
    }

    /// Watch feed changes.
    pub fn watch(&self) -> watch::Receiver<GamesState> {
        self.state_rx.clone()
    }

    /// A single game from the latest snapshot.
    pub fn game(&self, id: &DocumentId) -> Option<Game> {
        self.state_rx
            .borrow()
            .games
            .iter()
            .find(|game| &game.id == id)
            .cloned()
    }

    /// Games the viewer has not joined. Signed out, every game is
    /// available.
    pub fn available_games(&self) -> Vec<Game> {
        let viewer = self.viewer();
        let state = self.state_rx.borrow();
        available_games(&state.games, viewer.as_ref().map(|v| &v.id))
    }

    /// Games the viewer has joined. Signed out, none are.
    pub fn joined_games(&self) -> Vec<Game> {
        let viewer = self.viewer();
        let state = self.state_rx.borrow();
        joined_games(&state.games, viewer.as_ref().map(|v| &v.id))
    }

    /// Validate and persist a new game with the viewer as its first
    /// participant.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_game(&self, draft: GameDraft) -> Result<DocumentId> {
        let viewer = self.viewer();
        let creator = policy::ensure_signed_in(viewer.as_ref(), "create a game")?;
        let new_game = draft.validate()?;

        let max_players = new_game.max_players;
        let location = new_game.location.clone();

        let id = self
            .store
            .create(&self.collection, new_game.into_record(creator))
            .await?;
        info!(game_id = %id, "Game created");

        self.analytics.record(&AnalyticsEvent::GameCreated {
            has_max_players: max_players.is_some(),
            max_players: max_players.unwrap_or(0),
            location,
        });
        Ok(id)
    }

    /// Join a game.
    ///
    /// Membership and capacity are checked against the last observed
    /// snapshot; two joins racing for the final slot can both pass and
    /// leave the game over capacity.
    #[instrument(skip(self), fields(game_id = %id))]
    pub async fn join_game(&self, id: &DocumentId) -> Result<()> {
        let viewer = self.viewer();
        let actor = policy::ensure_signed_in(viewer.as_ref(), "join a game")?;

        let game = self.game(id).ok_or(Error::NotFound("Game"))?;
        policy::ensure_can_join_game(&game, actor)?;

        let participant = Participant::snapshot(actor);
        self.store
            .update(
                &self.collection,
                id,
                vec![WriteOp::array_union("participants", participant.to_record())],
            )
            .await?;
        info!(game_id = %id, "Joined game");

        let current_players = game.participants.len() + 1;
        self.analytics.record(&AnalyticsEvent::GameJoined {
            game_id: id.to_string(),
            current_players,
            max_players: game.max_players,
            is_full: game
                .max_players
                .is_some_and(|max| current_players as u32 >= max),
            has_max_players: game.max_players.is_some(),
        });
        Ok(())
    }

    /// Leave a game. Removal is keyed by the viewer's id, so an entry
    /// with drifted display fields is still removed.
    #[instrument(skip(self), fields(game_id = %id))]
    pub async fn leave_game(&self, id: &DocumentId) -> Result<()> {
        let viewer = self.viewer();
        let actor = policy::ensure_signed_in(viewer.as_ref(), "leave a game")?;

        let game = self.game(id);
        policy::ensure_can_leave_game(game.as_ref(), actor)?;

        self.store
            .update(
                &self.collection,
                id,
                vec![WriteOp::array_remove_by_key(
                    "participants",
                    "uid",
                    Value::from(actor.id.as_str()),
                )],
            )
            .await?;
        info!(game_id = %id, "Left game");

        self.analytics.record(&AnalyticsEvent::GameLeft {
            game_id: id.to_string(),
        });
        Ok(())
    }

    /// Delete a game. Creator only.
    #[instrument(skip(self), fields(game_id = %id))]
    pub async fn delete_game(&self, id: &DocumentId) -> Result<()> {
        let viewer = self.viewer();
        let actor = policy::ensure_signed_in(viewer.as_ref(), "delete a game")?;

        let game = self.game(id).ok_or(Error::NotFound("Game"))?;
        policy::ensure_can_delete_game(&game, actor)?;

        self.store.delete(&self.collection, id).await?;
        info!(game_id = %id, "Game deleted");

        self.analytics.record(&AnalyticsEvent::GameDeleted {
            game_id: id.to_string(),
        });
        Ok(())
    }

    fn viewer(&self) -> Option<Identity> {
        self.session.borrow().viewer.clone()
    }
}

impl Drop for GamesFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn games_task(
    store: Arc<dyn CollectionStore>,
    collection: String,
    state_tx: watch::Sender<GamesState>,
) {
    let mut subscription = match store.subscribe(&collection, OrderBy::ascending("startTime")) {
        Ok(subscription) => subscription,
        Err(err) => {
            error!(%collection, error = %err, "Failed to open games subscription");
            let _ = state_tx.send(GamesState {
                games: Vec::new(),
                loading: false,
                error: Some(err.to_string()),
            });
            return;
        }
    };

    loop {
        match subscription.recv().await {
            Ok(docs) => {
                let _ = state_tx.send(GamesState {
                    games: decode_games(&docs),
                    loading: false,
                    error: None,
                });
            }
            Err(err) => {
                error!(%collection, error = %err, "Games subscription failed");
                let mut state = state_tx.borrow().clone();
                state.loading = false;
                state.error = Some(err.to_string());
                let _ = state_tx.send(state);
                return;
            }
        }
    }
}

fn decode_games(docs: &[Document]) -> Vec<Game> {
    docs.iter()
        .filter_map(|doc| match Game::from_document(doc) {
            Ok(game) => {
                invariants::assert_game_invariants(&game);
                Some(game)
            }
            Err(err) => {
                warn!(id = %doc.id, error = %err, "Skipping malformed game record");
                None
            }
        })
        .collect()
}
