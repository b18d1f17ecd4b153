//! Data models for Rondo

mod game;
mod group;
mod identity;
mod player;

pub use game::*;
pub use group::*;
pub use identity::*;
pub use player::*;
