//! Client composition root
//!
//! Wires the store, identity provider, analytics sink, session, and
//! feeds into one handle. Embedders hold a [`Client`] and read
//! everything else through it.

use std::sync::Arc;

use tracing::info;

use rondo_core::{CollectionStore, LocalStore, StoreError};

use crate::analytics::{AnalyticsEvent, AnalyticsSink, NoopAnalytics};
use crate::auth::IdentityProvider;
use crate::config::{ClientConfig, ConfigError};
use crate::feeds::{GamesFeed, GroupsFeed, PlayersFeed};
use crate::session::Session;

/// Error type for client startup
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A running scheduling client.
pub struct Client {
    session: Session,
    games: GamesFeed,
    groups: GroupsFeed,
    players: PlayersFeed,
    analytics: Arc<dyn AnalyticsSink>,
}

impl Client {
    /// Wire a client from explicit parts. Must run inside a tokio
    /// runtime; the session and feed tasks spawn immediately.
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn CollectionStore>,
        provider: Arc<dyn IdentityProvider>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let analytics: Arc<dyn AnalyticsSink> = if config.analytics.enabled {
            analytics
        } else {
            Arc::new(NoopAnalytics)
        };

        let collections = config.collections();
        let session = Session::spawn(provider, store.clone(), analytics.clone(), &collections);
        let games = GamesFeed::spawn(
            store.clone(),
            session.watch(),
            analytics.clone(),
            collections.games,
        );
        let groups = GroupsFeed::spawn(store.clone(), session.watch(), collections.groups);
        let players = PlayersFeed::spawn(store, session.watch(), collections.players);

        Self {
            session,
            games,
            groups,
            players,
            analytics,
        }
    }

    /// Open the configured local store and wire a client over it.
    pub fn open(
        config: &ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Result<Self, ClientError> {
        let path = config.store_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "Opening local store");
        let store: Arc<dyn CollectionStore> = Arc::new(LocalStore::open(&path)?);
        Ok(Self::new(config, store, provider, analytics))
    }

    /// Wire a client over an ephemeral in-memory store.
    pub fn open_in_memory(
        config: &ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Result<Self, ClientError> {
        let store: Arc<dyn CollectionStore> = Arc::new(LocalStore::open_in_memory()?);
        Ok(Self::new(config, store, provider, analytics))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn games(&self) -> &GamesFeed {
        &self.games
    }

    pub fn groups(&self) -> &GroupsFeed {
        &self.groups
    }

    pub fn players(&self) -> &PlayersFeed {
        &self.players
    }

    /// Record a screen view.
    pub fn track_page_view(&self, title: &str, path: &str) {
        self.analytics.record(&AnalyticsEvent::PageView {
            title: title.to_string(),
            path: path.to_string(),
        });
    }
}
