//! Rondo Client Runtime
//!
//! Live pickup-game scheduling over a shared document store: a viewer
//! session fed by an external identity provider, one feed per watched
//! collection, and fire-and-forget usage analytics. The rules
//! themselves live in `rondo-core`; this crate runs them.

pub mod analytics;
pub mod auth;
pub mod client;
pub mod config;
pub mod feeds;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod testutil;

pub use analytics::{AnalyticsEvent, AnalyticsSink, NoopAnalytics, TracingAnalytics};
pub use auth::{AuthError, IdentityProvider, StaticIdentityProvider};
pub use client::{Client, ClientError};
pub use config::{ClientConfig, CollectionNames, ConfigError};
pub use feeds::{GamesFeed, GamesState, GroupsFeed, GroupsState, PlayersFeed, PlayersState};
pub use session::{Session, SessionState};
