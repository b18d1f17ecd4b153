//! Group model - a community of players with one owner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::identity::{Identity, UserId};
use crate::error::{Error, Result};
use crate::store::{Document, DocumentId};

/// A named roster of players. The owner is always a member; no
/// owner-leave or delete operation exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip)]
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: UserId,
    /// Display copies of the owner's identity at creation time; may go
    /// stale if the owner later renames.
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Decode a stored group record.
    pub fn from_document(doc: &Document) -> std::result::Result<Self, serde_json::Error> {
        let mut group: Group = serde_json::from_value(doc.data.clone())?;
        group.id = doc.id.clone();
        group.created_at = doc.created_at;
        Ok(group)
    }

    pub fn is_member(&self, uid: &UserId) -> bool {
        self.members.contains(uid)
    }

    pub fn is_owner(&self, uid: &UserId) -> bool {
        &self.owner_id == uid
    }
}

/// Unvalidated form input for a new group.
#[derive(Debug, Clone, Default)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
}

impl GroupDraft {
    /// Validate and normalize: the name must be non-empty after
    /// trimming, the description defaults to empty.
    pub fn validate(self) -> Result<NewGroup> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Group name is required.".to_string()));
        }

        Ok(NewGroup {
            name,
            description: self.description.trim().to_string(),
        })
    }
}

/// A validated group ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

impl NewGroup {
    /// Build the stored record, with the owner as sole member.
    pub fn into_record(self, owner: &Identity) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "ownerId": owner.id,
            "ownerName": owner.display_name,
            "ownerEmail": owner.email.clone().unwrap_or_default(),
            "members": [owner.id],
        })
    }
}

/// Groups the viewer belongs to; empty when signed out.
pub fn user_groups(groups: &[Group], viewer: Option<&UserId>) -> Vec<Group> {
    match viewer {
        Some(uid) => groups
            .iter()
            .filter(|group| group.is_member(uid))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

/// Groups the viewer could join; empty when signed out.
pub fn discoverable_groups(groups: &[Group], viewer: Option<&UserId>) -> Vec<Group> {
    match viewer {
        Some(uid) => groups
            .iter()
            .filter(|group| !group.is_member(uid))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}
