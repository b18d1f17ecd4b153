//! Usage analytics
//!
//! Events are fire-and-forget: a sink failure is logged and dropped,
//! never surfaced to the operation that produced the event.

use std::sync::Mutex;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use rondo_core::Identity;

/// A named usage event with a small structured payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    PageView {
        title: String,
        path: String,
    },
    Login {
        method: String,
    },
    Logout,
    SignUp {
        method: String,
    },
    GameCreated {
        has_max_players: bool,
        max_players: u32,
        location: String,
    },
    GameJoined {
        game_id: String,
        current_players: usize,
        max_players: Option<u32>,
        is_full: bool,
        has_max_players: bool,
    },
    GameLeft {
        game_id: String,
    },
    GameDeleted {
        game_id: String,
    },
}

impl AnalyticsEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::PageView { .. } => "page_view",
            AnalyticsEvent::Login { .. } => "login",
            AnalyticsEvent::Logout => "logout",
            AnalyticsEvent::SignUp { .. } => "sign_up",
            AnalyticsEvent::GameCreated { .. } => "game_created",
            AnalyticsEvent::GameJoined { .. } => "game_joined",
            AnalyticsEvent::GameLeft { .. } => "game_left",
            AnalyticsEvent::GameDeleted { .. } => "game_deleted",
        }
    }

    /// Structured parameters of the event.
    pub fn params(&self) -> Map<String, Value> {
        let value = match self {
            AnalyticsEvent::PageView { title, path } => json!({
                "page_title": title,
                "page_location": path,
                "page_path": path,
            }),
            AnalyticsEvent::Login { method } => json!({ "method": method }),
            AnalyticsEvent::Logout => json!({}),
            AnalyticsEvent::SignUp { method } => json!({ "method": method }),
            AnalyticsEvent::GameCreated {
                has_max_players,
                max_players,
                location,
            } => json!({
                "has_max_players": has_max_players,
                "max_players": max_players,
                "location": location,
            }),
            AnalyticsEvent::GameJoined {
                game_id,
                current_players,
                max_players,
                is_full,
                has_max_players,
            } => json!({
                "game_id": game_id,
                "current_players": current_players,
                "max_players": max_players,
                "is_full": is_full,
                "has_max_players": has_max_players,
            }),
            AnalyticsEvent::GameLeft { game_id } => json!({ "game_id": game_id }),
            AnalyticsEvent::GameDeleted { game_id } => json!({ "game_id": game_id }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Destination for usage events.
///
/// `record` has no error channel: implementations log and swallow
/// their own failures.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: &AnalyticsEvent);

    /// Associate subsequent events with a viewer, or clear the
    /// association on `None`.
    fn set_user(&self, _user: Option<&Identity>) {}
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn record(&self, _event: &AnalyticsEvent) {}
}

/// Sink that logs events through `tracing`, tagged with a per-process
/// instance id. Stands in for a hosted analytics pipeline.
pub struct TracingAnalytics {
    instance_id: Uuid,
    user_id: Mutex<Option<String>>,
}

impl TracingAnalytics {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            user_id: Mutex::new(None),
        }
    }
}

impl Default for TracingAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsSink for TracingAnalytics {
    fn record(&self, event: &AnalyticsEvent) {
        let params = match serde_json::to_string(&Value::Object(event.params())) {
            Ok(params) => params,
            Err(err) => {
                warn!(error = %err, event = event.name(), "Analytics event failed");
                return;
            }
        };
        let user_id = self
            .user_id
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        debug!(
            instance = %self.instance_id,
            user_id = user_id.as_deref().unwrap_or(""),
            event = event.name(),
            %params,
            "analytics event"
        );
    }

    fn set_user(&self, user: Option<&Identity>) {
        if let Some(identity) = user {
            debug!(
                instance = %self.instance_id,
                user_id = %identity.id,
                user_name = %identity.display_name,
                "analytics user properties"
            );
        }
        if let Ok(mut slot) = self.user_id.lock() {
            *slot = user.map(|identity| identity.id.to_string());
        }
    }
}

/// Test sink that keeps every event it sees.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

#[cfg(test)]
impl RecordingAnalytics {
    pub(crate) fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnalyticsEvent::name).collect()
    }
}

#[cfg(test)]
impl AnalyticsSink for RecordingAnalytics {
    fn record(&self, event: &AnalyticsEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
