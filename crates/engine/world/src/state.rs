use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use piece::PieceId;
use thiserror::Error;

use crate::brick::{Brick, BrickId, BrickKind};
use crate::player::Player;

/// World edits the host must distinguish.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("unknown brick {0:?}")]
    UnknownBrick(BrickId),
    #[error("brick {0:?} is protected")]
    Protected(BrickId),
}

/// Placed bricks and connected players.
///
/// Both maps are `BTreeMap` so iteration order is deterministic; spatial
/// index rebuilds and collision sweeps then behave identically across runs
/// for the same world.
#[derive(Debug, Default)]
pub struct WorldState {
    bricks: BTreeMap<BrickId, Brick>,
    players: BTreeMap<String, Player>,
    next_brick: u64,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a brick and assigns it the next id. The caller must rebuild
    /// the spatial index before the next collision query.
    pub fn insert_brick(
        &mut self,
        piece: PieceId,
        position: Vec3,
        rotation: Quat,
        color: u8,
        kind: BrickKind,
    ) -> BrickId {
        let id = BrickId(self.next_brick);
        self.next_brick += 1;
        self.bricks.insert(
            id,
            Brick {
                id,
                piece,
                position,
                rotation,
                color,
                kind,
            },
        );
        id
    }

    /// Removes a brick. Ground bricks refuse deletion.
    pub fn remove_brick(&mut self, id: BrickId) -> Result<Brick, EditError> {
        match self.bricks.entry(id) {
            Entry::Vacant(_) => Err(EditError::UnknownBrick(id)),
            Entry::Occupied(e) if e.get().kind == BrickKind::Ground => {
                Err(EditError::Protected(id))
            }
            Entry::Occupied(e) => Ok(e.remove()),
        }
    }

    #[inline]
    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(&id)
    }

    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.values()
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    /// Adds or replaces a player body.
    pub fn insert_player(&mut self, name: impl Into<String>, player: Player) {
        self.players.insert(name.into(), player);
    }

    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        self.players.remove(name)
    }

    #[inline]
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.get_mut(name)
    }

    pub fn players(&self) -> impl Iterator<Item = (&str, &Player)> {
        self.players.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = (&str, &mut Player)> {
        self.players.iter_mut().map(|(n, p)| (n.as_str(), p))
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
