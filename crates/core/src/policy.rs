//! Admission rules for game and group operations
//!
//! Every check runs against the most recently observed snapshot of the
//! record, before any store write. Under concurrent writers the checks
//! are advisory: the snapshot may be stale, and the store applies the
//! mutation without re-validating (over-fill of a game is possible when
//! two joins race at capacity).

use crate::error::{Error, Result};
use crate::models::{Game, Group, Identity, UserId};

/// Require a signed-in viewer; `action` completes the error message
/// ("You must be signed in to {action}.").
pub fn ensure_signed_in<'a>(
    viewer: Option<&'a Identity>,
    action: &'static str,
) -> Result<&'a Identity> {
    viewer.ok_or(Error::Unauthenticated(action))
}

/// May `actor` join this game?
pub fn ensure_can_join_game(game: &Game, actor: &Identity) -> Result<()> {
    if game.has_participant(&actor.id) {
        return Err(Error::AlreadyMember(
            "You are already part of this game.".to_string(),
        ));
    }
    if game.is_full() {
        return Err(Error::Full);
    }
    Ok(())
}

/// May `actor` leave this game? The creator may leave like anyone else;
/// only deletion is creator-privileged. A game missing from the
/// snapshot reads as not joined.
pub fn ensure_can_leave_game(game: Option<&Game>, actor: &Identity) -> Result<()> {
    let joined = game.is_some_and(|g| g.has_participant(&actor.id));
    if !joined {
        return Err(Error::NotMember(
            "You are not part of this game.".to_string(),
        ));
    }
    Ok(())
}

/// May `actor` delete this game?
pub fn ensure_can_delete_game(game: &Game, actor: &Identity) -> Result<()> {
    if game.created_by != actor.id {
        return Err(Error::Forbidden(
            "Only the game creator can delete this game.".to_string(),
        ));
    }
    Ok(())
}

/// May `actor` join this group?
pub fn ensure_can_join_group(group: &Group, actor: &Identity) -> Result<()> {
    if group.is_member(&actor.id) {
        return Err(Error::AlreadyMember(
            "You are already a member of this group.".to_string(),
        ));
    }
    Ok(())
}

/// May `actor` add `target` to this group?
pub fn ensure_can_add_member(group: &Group, actor: &Identity, target: &UserId) -> Result<()> {
    if !group.is_owner(&actor.id) {
        return Err(Error::Forbidden(
            "Only the group owner can add new members.".to_string(),
        ));
    }
    if group.is_member(target) {
        return Err(Error::AlreadyMember(
            "This player is already a member of the group.".to_string(),
        ));
    }
    Ok(())
}
