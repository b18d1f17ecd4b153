//! Debug-build consistency checks
//!
//! Feeds run decoded snapshots through these before publishing them.
//! All of it compiles out in release builds.

use std::collections::HashSet;

use crate::models::{Game, Group};

/// Validate that a Game's state is internally consistent
pub fn assert_game_invariants(game: &Game) {
    // Participants are a set keyed by uid
    let mut seen = HashSet::new();
    for participant in &game.participants {
        debug_assert!(
            seen.insert(&participant.uid),
            "Game {} has duplicate participant {}",
            game.id,
            participant.uid
        );
    }

    // Unlimited is encoded as None, never as zero
    debug_assert!(
        game.max_players != Some(0),
        "Game {} has maxPlayers 0, expected None for unlimited",
        game.id
    );

    debug_assert!(
        !game.title.trim().is_empty(),
        "Game {} has empty title",
        game.id
    );
}

/// Validate that a Group's state is internally consistent
pub fn assert_group_invariants(group: &Group) {
    debug_assert!(
        group.is_member(&group.owner_id),
        "Group {} owner {} is not a member",
        group.id,
        group.owner_id
    );

    let unique: HashSet<_> = group.members.iter().collect();
    debug_assert!(
        unique.len() == group.members.len(),
        "Group {} has duplicate members",
        group.id
    );

    debug_assert!(
        !group.name.trim().is_empty(),
        "Group {} has empty name",
        group.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Participant, UserId};
    use crate::store::DocumentId;
    use chrono::Utc;

    fn make_game() -> Game {
        let creator = Identity::new("u1", "Alex");
        Game {
            id: DocumentId::from("g1"),
            title: "Friday 5v5".to_string(),
            location: "Park".to_string(),
            start_time: Utc::now(),
            max_players: Some(10),
            created_by: creator.id.clone(),
            created_by_name: creator.display_name.clone(),
            participants: vec![Participant::snapshot(&creator)],
            created_at: Utc::now(),
        }
    }

    fn make_group() -> Group {
        Group {
            id: DocumentId::from("grp1"),
            name: "Downtown FC".to_string(),
            description: String::new(),
            owner_id: UserId::from("u1"),
            owner_name: "Alex".to_string(),
            owner_email: String::new(),
            members: vec![UserId::from("u1")],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_game() {
        assert_game_invariants(&make_game());
    }

    #[test]
    fn test_valid_group() {
        assert_group_invariants(&make_group());
    }

    #[test]
    #[should_panic(expected = "duplicate participant")]
    fn test_duplicate_participant_detected() {
        let mut game = make_game();
        game.participants.push(game.participants[0].clone());
        assert_game_invariants(&game);
    }

    #[test]
    #[should_panic(expected = "is not a member")]
    fn test_absent_owner_detected() {
        let mut group = make_group();
        group.members.clear();
        assert_group_invariants(&group);
    }
}
