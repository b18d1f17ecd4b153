//! Player directory model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::identity::{Identity, UserId};
use crate::store::Document;

/// One entry of the player directory, keyed by the user's id.
///
/// Upserted (merge) on every sign-in: `created_at` is fixed at the
/// first sign-in, `updated_at` moves each time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    #[serde(skip)]
    pub uid: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "photoURL", default)]
    pub photo_url: Option<String>,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    /// Decode a stored profile; the document id is the user's id.
    pub fn from_document(doc: &Document) -> std::result::Result<Self, serde_json::Error> {
        let mut profile: PlayerProfile = serde_json::from_value(doc.data.clone())?;
        profile.uid = UserId::from(doc.id.as_str());
        profile.created_at = doc.created_at;
        profile.updated_at = doc.updated_at;
        Ok(profile)
    }

    /// The merge payload written on sign-in. The uid is stored in the
    /// record as well as in the document id so denormalized readers can
    /// key on either.
    pub fn record_for(identity: &Identity) -> Value {
        json!({
            "uid": identity.id,
            "displayName": identity.display_name,
            "email": identity.email,
            "photoURL": identity.avatar_url,
        })
    }
}
