//! Groups feed and operations

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use rondo_core::store::FIELD_CREATED_AT;
use rondo_core::{
    discoverable_groups, invariants, policy, user_groups, CollectionStore, Document, DocumentId,
    Error, Group, GroupDraft, Identity, OrderBy, Result, UserId, WriteOp,
};

use crate::session::SessionState;

/// Published state of the groups collection.
#[derive(Debug, Clone)]
pub struct GroupsState {
    /// All groups, newest first.
    pub groups: Vec<Group>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for GroupsState {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// Live view of every group, plus membership operations.
pub struct GroupsFeed {
    store: Arc<dyn CollectionStore>,
    session: watch::Receiver<SessionState>,
    collection: String,
    state_rx: watch::Receiver<GroupsState>,
    task: JoinHandle<()>,
}

impl GroupsFeed {
    /// Start watching the groups collection.
    pub fn spawn(
        store: Arc<dyn CollectionStore>,
        session: watch::Receiver<SessionState>,
        collection: impl Into<String>,
    ) -> Self {
        let collection = collection.into();
        let (state_tx, state_rx) = watch::channel(GroupsState::default());
        let task = tokio::spawn(groups_task(store.clone(), collection.clone(), state_tx));
        Self {
            store,
            session,
            collection,
            state_rx,
            task,
        }
    }

    /// Current feed state.
    pub fn state(&self) -> GroupsState {
        self.state_rx.borrow().clone()
    }

    /// Watch feed changes.
    pub fn watch(&self) -> watch::Receiver<GroupsState> {
        self.state_rx.clone()
    }

    /// A single group from the latest snapshot.
    pub fn group(&self, id: &DocumentId) -> Option<Group> {
        self.state_rx
            .borrow()
            .groups
            .iter()
            .find(|group| &group.id == id)
            .cloned()
    }

    /// Groups the viewer belongs to. Empty while signed out.
    pub fn user_groups(&self) -> Vec<Group> {
        let viewer = self.viewer();
        let state = self.state_rx.borrow();
        user_groups(&state.groups, viewer.as_ref().map(|v| &v.id))
    }

    /// Groups the viewer could join. Empty while signed out.
    pub fn discoverable_groups(&self) -> Vec<Group> {
        let viewer = self.viewer();
        let state = self.state_rx.borrow();
        discoverable_groups(&state.groups, viewer.as_ref().map(|v| &v.id))
    }

    /// Validate and persist a new group owned by the viewer.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_group(&self, draft: GroupDraft) -> Result<DocumentId> {
        let viewer = self.viewer();
        let owner = policy::ensure_signed_in(viewer.as_ref(), "create a group")?;
        let new_group = draft.validate()?;

        let id = self
            .store
            .create(&self.collection, new_group.into_record(owner))
            .await?;
        info!(group_id = %id, "Group created");
        Ok(id)
    }

    /// Join a group.
    #[instrument(skip(self), fields(group_id = %id))]
    pub async fn join_group(&self, id: &DocumentId) -> Result<()> {
        let viewer = self.viewer();
        let actor = policy::ensure_signed_in(viewer.as_ref(), "join a group")?;

        let group = self.group(id).ok_or(Error::NotFound("Group"))?;
        policy::ensure_can_join_group(&group, actor)?;

        self.store
            .update(
                &self.collection,
                id,
                vec![WriteOp::array_union(
                    "members",
                    Value::from(actor.id.as_str()),
                )],
            )
            .await?;
        info!(group_id = %id, "Joined group");
        Ok(())
    }

    /// Add another player to a group. Owner only.
    #[instrument(skip(self), fields(group_id = %id, member = %target))]
    pub async fn add_member(&self, id: &DocumentId, target: &UserId) -> Result<()> {
        let viewer = self.viewer();
        let actor = policy::ensure_signed_in(viewer.as_ref(), "manage groups")?;

        if target.as_str().trim().is_empty() {
            return Err(Error::InvalidInput(
                "Select a player before adding them to the group.".to_string(),
            ));
        }

        let group = self.group(id).ok_or(Error::NotFound("Group"))?;
        policy::ensure_can_add_member(&group, actor, target)?;

        self.store
            .update(
                &self.collection,
                id,
                vec![WriteOp::array_union(
                    "members",
                    Value::from(target.as_str()),
                )],
            )
            .await?;
        info!(group_id = %id, member = %target, "Member added");
        Ok(())
    }

    fn viewer(&self) -> Option<Identity> {
        self.session.borrow().viewer.clone()
    }
}

impl Drop for GroupsFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn groups_task(
    store: Arc<dyn CollectionStore>,
    collection: String,
    state_tx: watch::Sender<GroupsState>,
) {
    let mut subscription =
        match store.subscribe(&collection, OrderBy::descending(FIELD_CREATED_AT)) {
            Ok(subscription) => subscription,
            Err(err) => {
                error!(%collection, error = %err, "Failed to open groups subscription");
                let _ = state_tx.send(GroupsState {
                    groups: Vec::new(),
                    loading: false,
                    error: Some(err.to_string()),
                });
                return;
            }
        };

    loop {
        match subscription.recv().await {
            Ok(docs) => {
                let _ = state_tx.send(GroupsState {
                    groups: decode_groups(&docs),
                    loading: false,
                    error: None,
                });
            }
            Err(err) => {
                error!(%collection, error = %err, "Groups subscription failed");
                let mut state = state_tx.borrow().clone();
                state.loading = false;
                state.error = Some(err.to_string());
                let _ = state_tx.send(state);
                return;
            }
        }
    }
}

fn decode_groups(docs: &[Document]) -> Vec<Group> {
    docs.iter()
        .filter_map(|doc| match Group::from_document(doc) {
            Ok(group) => {
                invariants::assert_group_invariants(&group);
                Some(group)
            }
            Err(err) => {
                warn!(id = %doc.id, error = %err, "Skipping malformed group record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{identity, memory_store, wait_for};

    struct Fixture {
        session_tx: watch::Sender<SessionState>,
        feed: GroupsFeed,
    }

    fn feed_over(store: Arc<dyn CollectionStore>, viewer: Option<Identity>) -> Fixture {
        let (session_tx, session_rx) = watch::channel(SessionState {
            viewer,
            profile_error: None,
        });
        let feed = GroupsFeed::spawn(store, session_rx, "groups");
        Fixture { session_tx, feed }
    }

    fn draft(name: &str) -> GroupDraft {
        GroupDraft {
            name: name.to_string(),
            description: "Weekly kickabout".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_requires_sign_in() {
        let fx = feed_over(memory_store(), None);
        let err = fx.feed.create_group(draft("Downtown FC")).await.unwrap_err();
        assert_eq!(err.to_string(), "You must be signed in to create a group.");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let fx = feed_over(memory_store(), Some(identity("u1", "Alex")));
        let err = fx.feed.create_group(draft("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Group name is required.");
    }

    #[tokio::test]
    async fn test_created_group_has_owner_as_member() {
        let fx = feed_over(memory_store(), Some(identity("u1", "Alex")));
        let id = fx.feed.create_group(draft("Downtown FC")).await.unwrap();

        let state = wait_for(&mut fx.feed.watch(), |s| !s.groups.is_empty()).await;
        let group = &state.groups[0];
        assert_eq!(group.id, id);
        assert_eq!(group.name, "Downtown FC");
        assert_eq!(group.owner_id.as_str(), "u1");
        assert_eq!(group.members, vec![UserId::from("u1")]);
    }

    #[tokio::test]
    async fn test_groups_are_ordered_newest_first() {
        let fx = feed_over(memory_store(), Some(identity("u1", "Alex")));
        fx.feed.create_group(draft("First")).await.unwrap();
        fx.feed.create_group(draft("Second")).await.unwrap();

        let state = wait_for(&mut fx.feed.watch(), |s| s.groups.len() == 2).await;
        assert_eq!(state.groups[0].name, "Second");
        assert_eq!(state.groups[1].name, "First");
    }

    #[tokio::test]
    async fn test_join_group() {
        let store = memory_store();
        let owner = feed_over(store.clone(), Some(identity("u1", "Alex")));
        let id = owner.feed.create_group(draft("Downtown FC")).await.unwrap();

        let joiner = feed_over(store, Some(identity("u2", "Blair")));
        wait_for(&mut joiner.feed.watch(), |s| !s.groups.is_empty()).await;
        joiner.feed.join_group(&id).await.unwrap();

        let state = wait_for(&mut joiner.feed.watch(), |s| {
            s.groups.first().is_some_and(|g| g.members.len() == 2)
        })
        .await;
        assert!(state.groups[0].is_member(&UserId::from("u2")));

        let err = joiner.feed.join_group(&id).await.unwrap_err();
        assert_eq!(err.to_string(), "You are already a member of this group.");
    }

    #[tokio::test]
    async fn test_join_unknown_group_is_not_found() {
        let fx = feed_over(memory_store(), Some(identity("u1", "Alex")));
        wait_for(&mut fx.feed.watch(), |s| !s.loading).await;

        let err = fx
            .feed
            .join_group(&DocumentId::from("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Group not found.");
    }

    #[tokio::test]
    async fn test_add_member_is_owner_only() {
        let store = memory_store();
        let owner = feed_over(store.clone(), Some(identity("u1", "Alex")));
        let id = owner.feed.create_group(draft("Downtown FC")).await.unwrap();
        wait_for(&mut owner.feed.watch(), |s| !s.groups.is_empty()).await;

        let other = feed_over(store.clone(), Some(identity("u2", "Blair")));
        wait_for(&mut other.feed.watch(), |s| !s.groups.is_empty()).await;
        let err = other
            .feed
            .add_member(&id, &UserId::from("u3"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Only the group owner can add new members.");

        owner.feed.add_member(&id, &UserId::from("u3")).await.unwrap();
        let state = wait_for(&mut owner.feed.watch(), |s| {
            s.groups.first().is_some_and(|g| g.members.len() == 2)
        })
        .await;
        assert!(state.groups[0].is_member(&UserId::from("u3")));

        let err = owner
            .feed
            .add_member(&id, &UserId::from("u3"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "This player is already a member of the group."
        );
    }

    #[tokio::test]
    async fn test_add_member_requires_a_target() {
        let store = memory_store();
        let owner = feed_over(store, Some(identity("u1", "Alex")));
        let id = owner.feed.create_group(draft("Downtown FC")).await.unwrap();
        wait_for(&mut owner.feed.watch(), |s| !s.groups.is_empty()).await;

        let err = owner
            .feed
            .add_member(&id, &UserId::from(""))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Select a player before adding them to the group."
        );
    }

    #[tokio::test]
    async fn test_views_partition_by_membership() {
        let store = memory_store();
        let owner = feed_over(store.clone(), Some(identity("u1", "Alex")));
        owner.feed.create_group(draft("Mine")).await.unwrap();

        let other = feed_over(store, Some(identity("u2", "Blair")));
        other.feed.create_group(draft("Theirs")).await.unwrap();
        wait_for(&mut owner.feed.watch(), |s| s.groups.len() == 2).await;

        let mine = owner.feed.user_groups();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Mine");
        let discoverable = owner.feed.discoverable_groups();
        assert_eq!(discoverable.len(), 1);
        assert_eq!(discoverable[0].name, "Theirs");

        // Both views empty while signed out
        owner.session_tx.send_replace(SessionState::default());
        assert!(owner.feed.user_groups().is_empty());
        assert!(owner.feed.discoverable_groups().is_empty());
    }
}
