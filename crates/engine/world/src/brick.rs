use glam::{Quat, Vec3};
use piece::PieceId;
use serde::{Deserialize, Serialize};

/// Identifier of a placed brick, unique within one world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BrickId(pub u64);

/// Placement class of a brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrickKind {
    /// Regular player-placed brick.
    #[default]
    Normal,
    /// Baseplate brick seeded by the host, protected from deletion.
    Ground,
}

/// A placed brick. Static once placed; only insert and remove mutate the
/// world, never a brick's pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    pub piece: PieceId,
    pub position: Vec3,
    pub rotation: Quat,
    pub color: u8,
    pub kind: BrickKind,
}
