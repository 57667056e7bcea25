use std::time::Instant;

use brickworld_world::{WorldState, CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};
use glam::{Quat, Vec3};
use piece::{PieceId, PieceLibrary};
use tracing::warn;

use crate::aabb::Aabb;
use crate::index::WorldIndex;
use crate::mesh::PieceMeshes;

/// Magnitude of the narrow-phase perturbations. Deliberately larger than
/// the erosion margin so a candidate coincident with a placed brick still
/// registers: the eroded surface sits strictly inside the exact one until a
/// nudge pushes it across.
const NUDGE: f32 = 0.1;

/// The six axis perturbations. A candidate collides with a brick only when
/// every nudged pose intersects it; any offset that separates the meshes
/// means the contact was resting, not overlapping.
const NUDGE_OFFSETS: [Vec3; 6] = [
    Vec3::new(NUDGE, 0.0, 0.0),
    Vec3::new(-NUDGE, 0.0, 0.0),
    Vec3::new(0.0, NUDGE, 0.0),
    Vec3::new(0.0, -NUDGE, 0.0),
    Vec3::new(0.0, 0.0, NUDGE),
    Vec3::new(0.0, 0.0, -NUDGE),
];

/// A candidate placement: a piece at a world pose, not yet in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostCandidate {
    pub piece: PieceId,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Wall-clock milliseconds per ghost test phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GhostTimings {
    pub aabb_ms: f64,
    pub broad_ms: f64,
    pub build_ms: f64,
    pub narrow_ms: f64,
    pub total_ms: f64,
}

/// Outcome of a ghost test plus the numbers behind it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GhostReport {
    /// True when the placement must be refused.
    pub colliding: bool,
    /// Bricks surviving the broad phase.
    pub broad_count: usize,
    /// Broad-phase candidates dismissed by the narrow phase.
    pub pruned_count: usize,
    pub timings: GhostTimings,
}

impl GhostReport {
    fn blocked() -> Self {
        Self {
            colliding: true,
            ..Self::default()
        }
    }

    fn clear() -> Self {
        Self::default()
    }
}

/// World-space box of a player capsule at `center`.
pub(crate) fn capsule_aabb(center: Vec3) -> Aabb {
    let half = Vec3::new(
        CAPSULE_RADIUS,
        CAPSULE_HALF_HEIGHT + CAPSULE_RADIUS,
        CAPSULE_RADIUS,
    );
    Aabb::new(center - half, center + half)
}

/// Tests one candidate against every placed brick and player capsule.
///
/// Both API variants share this path, so the debug report's verdict always
/// matches the plain boolean. Unknown pieces pass permissively; non-finite
/// poses are refused outright.
pub(crate) fn evaluate(
    pieces: &PieceLibrary,
    meshes: &PieceMeshes,
    index: &WorldIndex,
    world: &WorldState,
    candidate: &GhostCandidate,
) -> GhostReport {
    let total_start = Instant::now();

    if !candidate.position.is_finite() || !candidate.rotation.is_finite() {
        warn!(piece = %candidate.piece, "non-finite ghost pose, treating as colliding");
        let mut report = GhostReport::blocked();
        report.timings.total_ms = ms_since(total_start);
        return report;
    }

    // Mesh lookup. Missing geometry never blocks building.
    let build_start = Instant::now();
    let Some(def) = pieces.get(candidate.piece) else {
        warn!(piece = %candidate.piece, "unknown piece in ghost test, allowing placement");
        let mut report = GhostReport::clear();
        report.timings.total_ms = ms_since(total_start);
        return report;
    };
    let Some(pair) = meshes.get(candidate.piece) else {
        warn!(piece = %candidate.piece, "piece has no collision mesh, allowing placement");
        let mut report = GhostReport::clear();
        report.timings.total_ms = ms_since(total_start);
        return report;
    };
    let build_ms = ms_since(build_start);

    // Candidate bounds, then players. Capsule overlap has no tolerance: a
    // brick may not be placed into anyone, touching included.
    let aabb_start = Instant::now();
    let ghost_aabb = Aabb::new(def.local_min, def.local_max)
        .transformed(candidate.rotation, candidate.position);
    for (_, player) in world.players() {
        if capsule_aabb(player.position).overlaps(&ghost_aabb) {
            let mut report = GhostReport::blocked();
            report.timings.build_ms = build_ms;
            report.timings.aabb_ms = ms_since(aabb_start);
            report.timings.total_ms = ms_since(total_start);
            return report;
        }
    }
    let aabb_ms = ms_since(aabb_start);

    let broad_start = Instant::now();
    let mut broad = Vec::new();
    index.query(&ghost_aabb, |id, _| broad.push(id));
    let broad_ms = ms_since(broad_start);
    let broad_count = broad.len();

    let narrow_start = Instant::now();
    let mut colliding = false;
    let mut pruned_count = 0;
    for id in broad {
        let Some(brick) = world.brick(id) else {
            continue;
        };
        let Some(brick_pair) = meshes.get(brick.piece) else {
            pruned_count += 1;
            continue;
        };
        let blocked = NUDGE_OFFSETS.iter().all(|&offset| {
            pair.eroded.intersects_mesh(
                candidate.rotation,
                candidate.position + offset,
                &brick_pair.exact,
                brick.rotation,
                brick.position,
            )
        });
        if blocked {
            colliding = true;
            break;
        }
        pruned_count += 1;
    }
    let narrow_ms = ms_since(narrow_start);

    GhostReport {
        colliding,
        broad_count,
        pruned_count,
        timings: GhostTimings {
            aabb_ms,
            broad_ms,
            build_ms,
            narrow_ms,
            total_ms: ms_since(total_start),
        },
    }
}

#[inline]
fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
