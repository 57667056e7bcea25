use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Capsule radius shared by every player, in world units.
///
/// World units follow the piece grid: 20 per stud of pitch, 8 per plate of
/// height. The capsule is a vertical segment of half-height
/// [`CAPSULE_HALF_HEIGHT`] with this radius swept around it.
pub const CAPSULE_RADIUS: f32 = 8.0;

/// Half-height of the capsule's cylindrical segment, in world units.
pub const CAPSULE_HALF_HEIGHT: f32 = 12.0;

/// Server-side body state of one player. `position` is the capsule center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
}

impl Player {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}
