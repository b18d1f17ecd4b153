//! Live collection feeds
//!
//! One feed per watched collection. Each feed spawns a task that
//! consumes the store subscription and publishes decoded state through
//! a watch channel; mutating operations validate against the latest
//! published snapshot before writing. A failed subscription leaves the
//! feed in a persistent error state; it is never retried behind the
//! consumer's back.

mod games;
mod groups;
mod players;

pub use games::{GamesFeed, GamesState};
pub use groups::{GroupsFeed, GroupsState};
pub use players::{PlayersFeed, PlayersState};
