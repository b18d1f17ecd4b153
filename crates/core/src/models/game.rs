//! Game model - a scheduled match with a roster

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::identity::{Identity, UserId};
use crate::error::{Error, Result};
use crate::store::{Document, DocumentId};

/// Denormalized copy of an identity's display fields, frozen at join
/// time. A participant's shown name/photo does not track later identity
/// changes; that staleness is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub uid: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
}

impl Participant {
    /// Snapshot the given identity's display fields.
    pub fn snapshot(identity: &Identity) -> Self {
        Self {
            uid: identity.id.clone(),
            display_name: identity.display_name.clone(),
            photo_url: identity.avatar_url.clone(),
        }
    }

    /// The stored array entry for this participant.
    pub fn to_record(&self) -> Value {
        json!({
            "uid": self.uid,
            "displayName": self.display_name,
            "photoURL": self.photo_url,
        })
    }
}

/// One scheduled match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(skip)]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub start_time: DateTime<Utc>,
    /// `None` means unlimited.
    #[serde(default)]
    pub max_players: Option<u32>,
    pub created_by: UserId,
    #[serde(default)]
    pub created_by_name: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Decode a stored game record.
    pub fn from_document(doc: &Document) -> std::result::Result<Self, serde_json::Error> {
        let mut game: Game = serde_json::from_value(doc.data.clone())?;
        game.id = doc.id.clone();
        game.created_at = doc.created_at;
        Ok(game)
    }

    pub fn has_participant(&self, uid: &UserId) -> bool {
        self.participants.iter().any(|p| &p.uid == uid)
    }

    pub fn is_full(&self) -> bool {
        match self.max_players {
            Some(max) => self.participants.len() as u32 >= max,
            None => false,
        }
    }

    /// Roster fill state for display.
    pub fn player_progress(&self) -> PlayerProgress {
        let total_players = self.participants.len();
        let percentage = self.max_players.map(|max| {
            let filled = (total_players as f64 / max as f64) * 100.0;
            (filled.round() as u32).min(100)
        });
        PlayerProgress {
            total_players,
            max_players: self.max_players,
            percentage,
        }
    }
}

/// Derived roster fill state; `percentage` is `None` for unlimited games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerProgress {
    pub total_players: usize,
    pub max_players: Option<u32>,
    pub percentage: Option<u32>,
}

/// Unvalidated form input for a new game.
#[derive(Debug, Clone, Default)]
pub struct GameDraft {
    pub title: String,
    pub location: String,
    /// RFC3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
    pub start_time: String,
    pub max_players: Option<i64>,
}

impl GameDraft {
    /// Validate and normalize the draft.
    ///
    /// Title and location must be non-empty after trimming; the start
    /// time must parse to a valid instant; a non-positive or absent max
    /// normalizes to unlimited.
    pub fn validate(self) -> Result<NewGame> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("Game title is required.".to_string()));
        }

        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(Error::InvalidInput(
                "Game location is required.".to_string(),
            ));
        }

        let start_time = parse_start_time(self.start_time.trim()).ok_or_else(|| {
            Error::InvalidInput("A valid start time is required.".to_string())
        })?;

        let max_players = self
            .max_players
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0);

        Ok(NewGame {
            title,
            location,
            start_time,
            max_players,
        })
    }
}

/// A validated game ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub title: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub max_players: Option<u32>,
}

impl NewGame {
    /// Build the stored record, with the creator as first participant.
    pub fn into_record(self, creator: &Identity) -> Value {
        json!({
            "title": self.title,
            "location": self.location,
            "startTime": self.start_time,
            "maxPlayers": self.max_players,
            "createdBy": creator.id,
            "createdByName": creator.display_name,
            "participants": [Participant::snapshot(creator)],
        })
    }
}

fn parse_start_time(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Games the viewer has not joined. A signed-out viewer sees every game
/// here and none in [`joined_games`].
pub fn available_games(games: &[Game], viewer: Option<&UserId>) -> Vec<Game> {
    match viewer {
        Some(uid) => games
            .iter()
            .filter(|game| !game.has_participant(uid))
            .cloned()
            .collect(),
        None => games.to_vec(),
    }
}

/// Games the viewer has joined.
pub fn joined_games(games: &[Game], viewer: Option<&UserId>) -> Vec<Game> {
    match viewer {
        Some(uid) => games
            .iter()
            .filter(|game| game.has_participant(uid))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}
