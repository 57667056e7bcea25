//! Server-authoritative collision engine for the brick world.
//!
//! Two levels of spatial structure back every query: a world AABB tree over
//! placed bricks (rebuilt eagerly after any edit) and one triangle BVH per
//! piece geometry (built once at load). On top of those sit the ghost
//! placement tester, the ray picker, the connector placement planner, and
//! the player capsule resolver.
//!
//! Everything is passed explicitly: callers hand the piece library and the
//! world state into each query, and [`CollisionWorld`] owns only derived
//! data (prebuilt meshes and the index).

pub mod aabb;
pub mod capsule;
pub mod ghost;
pub mod index;
pub mod mesh;
pub mod placement;

use brickworld_world::{BrickId, Player, WorldState};
use glam::Vec3;
use piece::PieceLibrary;

pub use aabb::Aabb;
pub use capsule::RESOLVE_ITERATIONS;
pub use ghost::{GhostCandidate, GhostReport, GhostTimings};
pub use index::WorldIndex;
pub use mesh::{CollisionMesh, MeshPair, PieceMeshes};
pub use placement::{
    plan_placement, place_at_connector, snap_to_grid, AnchorMode, HoveredConnector,
    PlacementInputs, GRID_PITCH, GRID_RISE,
};

/// Ray through world space. `direction` should be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

/// Nearest brick a ray hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub brick: BrickId,
    pub point: Vec3,
    pub distance: f32,
}

/// The engine facade: prebuilt piece meshes plus the world index.
///
/// Build one per world right after the piece library loads, call
/// [`CollisionWorld::rebuild`] after every brick insert or removal, and the
/// query methods stay consistent with the world.
#[derive(Debug)]
pub struct CollisionWorld {
    meshes: PieceMeshes,
    index: WorldIndex,
}

impl CollisionWorld {
    /// Builds both collision mesh variants for every piece. The index
    /// starts empty; call [`CollisionWorld::rebuild`] once the world has
    /// bricks.
    pub fn new(pieces: &PieceLibrary) -> Self {
        Self {
            meshes: PieceMeshes::build(pieces),
            index: WorldIndex::new(),
        }
    }

    /// Recomputes the world index from scratch. Must run after every brick
    /// insert or removal, before any dependent query.
    pub fn rebuild(&mut self, pieces: &PieceLibrary, world: &WorldState) {
        self.index.rebuild(pieces, world);
    }

    /// Number of bricks currently indexed.
    pub fn indexed_bricks(&self) -> usize {
        self.index.len()
    }

    /// True when the candidate placement would overlap a brick or a player.
    pub fn test_ghost(
        &self,
        pieces: &PieceLibrary,
        world: &WorldState,
        candidate: &GhostCandidate,
    ) -> bool {
        ghost::evaluate(pieces, &self.meshes, &self.index, world, candidate).colliding
    }

    /// Same verdict as [`CollisionWorld::test_ghost`] plus phase counts and
    /// timings for diagnosis.
    pub fn test_ghost_with_report(
        &self,
        pieces: &PieceLibrary,
        world: &WorldState,
        candidate: &GhostCandidate,
    ) -> GhostReport {
        ghost::evaluate(pieces, &self.meshes, &self.index, world, candidate)
    }

    /// Pushes the player capsule out of the world with the default pass
    /// count.
    pub fn resolve_player(&self, player: &mut Player) {
        capsule::resolve(&self.index, player, RESOLVE_ITERATIONS);
    }

    /// Pushes the player capsule out of the world with an explicit pass
    /// count.
    pub fn resolve_player_with_iterations(&self, player: &mut Player, iterations: usize) {
        capsule::resolve(&self.index, player, iterations);
    }

    /// Nearest brick hit by a ray, testing exact piece meshes in brick
    /// local space. Returns `None` for a degenerate ray or a clean miss.
    pub fn raycast(
        &self,
        pieces: &PieceLibrary,
        world: &WorldState,
        ray: &Ray,
    ) -> Option<RayHit> {
        if !ray.origin.is_finite() || !ray.direction.is_finite() {
            return None;
        }
        let direction = ray.direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let inv_dir = direction.recip();

        let mut best: Option<RayHit> = None;
        self.index.query_ray(ray.origin, inv_dir, |id| {
            let Some(brick) = world.brick(id) else {
                return;
            };
            let Some(pair) = self.meshes.get(brick.piece) else {
                return;
            };
            let inv_rot = brick.rotation.inverse();
            let local_origin = inv_rot * (ray.origin - brick.position);
            let local_dir = inv_rot * direction;
            if let Some(distance) = pair.exact.intersects_ray(local_origin, local_dir) {
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit {
                        brick: id,
                        point: ray.origin + direction * distance,
                        distance,
                    });
                }
            }
        });
        best
    }
}
