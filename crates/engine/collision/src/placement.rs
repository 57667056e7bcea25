use brickworld_world::WorldState;
use glam::{EulerRot, Quat, Vec3};
use piece::{ConnectorKind, PieceDefinition, PieceId, PieceLibrary};
use tracing::warn;

use crate::ghost::GhostCandidate;
use crate::{CollisionWorld, Ray};

/// Stud grid pitch in world units.
pub const GRID_PITCH: f32 = 20.0;

/// Vertical bias applied to grid-snapped fallback positions, one plate up.
pub const GRID_RISE: f32 = 8.0;

/// Which way a ghost mates onto the hovered geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorMode {
    /// One of the ghost's anti-studs seats onto a hovered stud.
    #[default]
    AntiStud,
    /// One of the ghost's studs seats into a hovered anti-stud.
    Stud,
}

impl AnchorMode {
    /// Connector list used on the ghost side.
    #[inline]
    pub fn ghost_kind(self) -> ConnectorKind {
        match self {
            AnchorMode::AntiStud => ConnectorKind::AntiStud,
            AnchorMode::Stud => ConnectorKind::Stud,
        }
    }

    /// Connector list searched on the hovered brick.
    #[inline]
    pub fn target_kind(self) -> ConnectorKind {
        self.ghost_kind().opposite()
    }
}

/// A connector on a placed brick, already in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoveredConnector {
    pub position: Vec3,
    pub direction: Vec3,
}

/// One frame of placement input.
///
/// `connector_index` selects which ghost connector seats onto the target
/// and wraps modulo the list length, so cycling past the end is safe.
/// `euler` (pitch, yaw, roll) overrides `yaw` when set.
#[derive(Debug, Clone, Copy)]
pub struct PlacementInputs {
    pub piece: PieceId,
    pub mode: AnchorMode,
    pub connector_index: usize,
    pub yaw: f32,
    pub euler: Option<Vec3>,
}

impl PlacementInputs {
    pub fn new(piece: PieceId) -> Self {
        Self {
            piece,
            mode: AnchorMode::default(),
            connector_index: 0,
            yaw: 0.0,
            euler: None,
        }
    }

    /// Base orientation before connector alignment: plain yaw, or the full
    /// Euler override applied yaw first, then pitch, then roll.
    pub fn base_orientation(&self) -> Quat {
        match self.euler {
            Some(e) => Quat::from_euler(EulerRot::YXZ, e.y, e.x, e.z),
            None => Quat::from_rotation_y(self.yaw),
        }
    }
}

/// Computes the ghost pose for the hovered ray, or `None` when there is
/// nothing sensible to hover (unknown piece, ray parallel to the ground
/// and hitting nothing).
///
/// Pure with respect to its inputs: the same world, inputs, and ray always
/// produce bit-identical poses. No collision check happens here; the
/// returned candidate goes through the ghost tester unchanged.
pub fn plan_placement(
    pieces: &PieceLibrary,
    world: &WorldState,
    collision: &CollisionWorld,
    inputs: &PlacementInputs,
    ray: &Ray,
) -> Option<GhostCandidate> {
    let Some(def) = pieces.get(inputs.piece) else {
        warn!(piece = %inputs.piece, "planning with unknown piece");
        return None;
    };

    if let Some(hit) = collision.raycast(pieces, world, ray) {
        let hovered = world
            .brick(hit.brick)
            .and_then(|brick| pieces.get(brick.piece).map(|d| (brick, d)))
            .and_then(|(brick, brick_def)| {
                nearest_connector(
                    brick_def,
                    brick.rotation,
                    brick.position,
                    inputs.mode.target_kind(),
                    hit.point,
                )
            });
        if let Some(hovered) = hovered {
            if let Some(candidate) = place_at_connector(def, inputs, &hovered) {
                return Some(candidate);
            }
        }
        return Some(snapped_candidate(inputs, hit.point));
    }

    ground_plane_point(ray).map(|point| snapped_candidate(inputs, point))
}

/// Aligns the selected ghost connector onto a hovered connector.
///
/// The ghost's connector direction (after the base orientation) is rotated
/// by the shortest arc onto the reverse of the hovered direction, so the
/// two connectors face each other; the position then makes the connector
/// points coincide exactly. Returns `None` when the ghost has no connector
/// of the required kind and the caller should fall back to grid snapping.
pub fn place_at_connector(
    def: &PieceDefinition,
    inputs: &PlacementInputs,
    hovered: &HoveredConnector,
) -> Option<GhostCandidate> {
    let list = def.connectors(inputs.mode.ghost_kind());
    if list.is_empty() {
        return None;
    }
    let connector = &list[inputs.connector_index % list.len()];

    let base = inputs.base_orientation();
    let from = (base * connector.direction).normalize();
    let to = (-hovered.direction).normalize();
    let rotation = (Quat::from_rotation_arc(from, to) * base).normalize();
    let position = hovered.position - rotation * connector.position;
    Some(GhostCandidate {
        piece: def.id,
        position,
        rotation,
    })
}

/// Per-axis snap to the stud grid plus one plate of upward bias.
pub fn snap_to_grid(point: Vec3) -> Vec3 {
    (point / GRID_PITCH).round() * GRID_PITCH + Vec3::Y * GRID_RISE
}

fn snapped_candidate(inputs: &PlacementInputs, point: Vec3) -> GhostCandidate {
    GhostCandidate {
        piece: inputs.piece,
        position: snap_to_grid(point),
        rotation: inputs.base_orientation(),
    }
}

/// Nearest world-space connector of `kind` on a brick to `point`.
fn nearest_connector(
    def: &PieceDefinition,
    rotation: Quat,
    position: Vec3,
    kind: ConnectorKind,
    point: Vec3,
) -> Option<HoveredConnector> {
    def.connectors(kind)
        .iter()
        .map(|c| HoveredConnector {
            position: rotation * c.position + position,
            direction: rotation * c.direction,
        })
        .min_by(|a, b| {
            a.position
                .distance_squared(point)
                .total_cmp(&b.position.distance_squared(point))
        })
}

/// Where the ray meets the ground plane y = 0, if it does.
fn ground_plane_point(ray: &Ray) -> Option<Vec3> {
    if ray.direction.y.abs() < 1e-6 {
        return None;
    }
    let t = -ray.origin.y / ray.direction.y;
    (t >= 0.0).then(|| ray.origin + ray.direction * t)
}
