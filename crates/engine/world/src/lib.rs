//! Authoritative world state: placed bricks and connected players.
//!
//! Bricks are static once placed; the collision engine reads them through
//! this crate and maintains its own spatial index over them.

mod brick;
mod player;
mod state;

pub use brick::{Brick, BrickId, BrickKind};
pub use player::{Player, CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};
pub use state::{EditError, WorldState};
