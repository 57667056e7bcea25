use brickworld_world::{BrickId, WorldState};
use glam::Vec3;
use piece::PieceLibrary;
use tracing::{debug, warn};

use crate::aabb::Aabb;
use crate::mesh::largest_axis;

/// Leaf capacity of the world tree.
const LEAF_ENTRIES: usize = 8;

#[derive(Debug, Clone)]
struct Entry {
    brick: BrickId,
    aabb: Aabb,
}

#[derive(Debug, Clone)]
enum IndexNode {
    Leaf { aabb: Aabb, start: u32, count: u32 },
    Internal { aabb: Aabb, left: u32, right: u32 },
}

impl IndexNode {
    #[inline]
    fn aabb(&self) -> &Aabb {
        match self {
            IndexNode::Leaf { aabb, .. } | IndexNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Binary AABB tree over the world bounds of every placed brick.
///
/// The tree is rebuilt wholesale after any insert or removal; queries
/// against a stale tree return wrong answers, so the host rebuilds within
/// the same edit before anything else runs. Node boxes are exact unions of
/// their descendants and every entry lives in exactly one leaf.
#[derive(Debug, Default)]
pub struct WorldIndex {
    entries: Vec<Entry>,
    nodes: Vec<IndexNode>,
    root: Option<u32>,
}

impl WorldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed bricks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recomputes every brick's world AABB and rebuilds the tree top-down,
    /// splitting at the median of the largest extent axis.
    pub fn rebuild(&mut self, pieces: &PieceLibrary, world: &WorldState) {
        self.entries.clear();
        self.nodes.clear();
        self.root = None;

        for brick in world.bricks() {
            // No geometry means no collision data: the brick stays out of
            // the index so capsule and ray queries never see it.
            let Some(def) = pieces.get(brick.piece) else {
                warn!(brick = brick.id.0, piece = %brick.piece, "unknown piece, leaving brick unindexed");
                continue;
            };
            let aabb = Aabb::new(def.local_min, def.local_max)
                .transformed(brick.rotation, brick.position);
            self.entries.push(Entry {
                brick: brick.id,
                aabb,
            });
        }

        if !self.entries.is_empty() {
            let end = self.entries.len();
            let root = build_range(&mut self.entries, &mut self.nodes, 0, end);
            self.root = Some(root);
        }
        debug!(bricks = self.entries.len(), nodes = self.nodes.len(), "world index rebuilt");
    }

    /// Visits every entry whose box overlaps `target`, touching included.
    /// Iterative traversal with an explicit stack.
    pub fn query(&self, target: &Aabb, mut visit: impl FnMut(BrickId, &Aabb)) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            match &self.nodes[i as usize] {
                IndexNode::Leaf { aabb, start, count } => {
                    if !aabb.overlaps(target) {
                        continue;
                    }
                    for entry in &self.entries[*start as usize..(*start + *count) as usize] {
                        if entry.aabb.overlaps(target) {
                            visit(entry.brick, &entry.aabb);
                        }
                    }
                }
                IndexNode::Internal { aabb, left, right } => {
                    if aabb.overlaps(target) {
                        stack.push(*left);
                        stack.push(*right);
                    }
                }
            }
        }
    }

    /// Visits every entry whose box the ray could enter. Candidates only;
    /// the caller runs exact mesh tests and keeps the nearest hit.
    pub fn query_ray(&self, origin: Vec3, inv_dir: Vec3, mut visit: impl FnMut(BrickId)) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            match &self.nodes[i as usize] {
                IndexNode::Leaf { aabb, start, count } => {
                    if aabb.ray_entry(origin, inv_dir).is_none() {
                        continue;
                    }
                    for entry in &self.entries[*start as usize..(*start + *count) as usize] {
                        if entry.aabb.ray_entry(origin, inv_dir).is_some() {
                            visit(entry.brick);
                        }
                    }
                }
                IndexNode::Internal { aabb, left, right } => {
                    if aabb.ray_entry(origin, inv_dir).is_some() {
                        stack.push(*left);
                        stack.push(*right);
                    }
                }
            }
        }
    }
}

fn build_range(entries: &mut [Entry], nodes: &mut Vec<IndexNode>, start: usize, end: usize) -> u32 {
    let mut aabb = entries[start].aabb;
    for e in &entries[start + 1..end] {
        aabb = aabb.union(&e.aabb);
    }
    let count = end - start;
    if count <= LEAF_ENTRIES {
        nodes.push(IndexNode::Leaf {
            aabb,
            start: start as u32,
            count: count as u32,
        });
        return (nodes.len() - 1) as u32;
    }

    let axis = largest_axis(aabb.size());
    entries[start..end].sort_unstable_by(|a, b| {
        a.aabb.center()[axis].total_cmp(&b.aabb.center()[axis])
    });
    let mid = start + count / 2;
    let left = build_range(entries, nodes, start, mid);
    let right = build_range(entries, nodes, mid, end);
    nodes.push(IndexNode::Internal { aabb, left, right });
    (nodes.len() - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickworld_world::BrickKind;
    use glam::Quat;
    use piece::{PieceDefinition, PieceGeometry, PieceId};

    fn cube_library(half: f32) -> PieceLibrary {
        let mut lib = PieceLibrary::new();
        lib.insert(
            PieceDefinition::new(
                PieceId(1),
                "cube",
                vec![],
                vec![],
                PieceGeometry::cuboid(Vec3::splat(-half), Vec3::splat(half)),
            )
            .unwrap(),
        );
        lib
    }

    fn grid_world(n: i32, spacing: f32) -> WorldState {
        let mut world = WorldState::new();
        for x in 0..n {
            for z in 0..n {
                world.insert_brick(
                    PieceId(1),
                    Vec3::new(x as f32 * spacing, 0.0, z as f32 * spacing),
                    Quat::IDENTITY,
                    0,
                    BrickKind::Normal,
                );
            }
        }
        world
    }

    fn collect(index: &WorldIndex, target: &Aabb) -> Vec<u64> {
        let mut out = Vec::new();
        index.query(target, |id, _| out.push(id.0));
        out.sort_unstable();
        out
    }

    #[test]
    fn test_empty_world_queries_nothing() {
        let mut index = WorldIndex::new();
        index.rebuild(&cube_library(10.0), &WorldState::new());
        assert!(index.is_empty());
        assert!(collect(&index, &Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0))).is_empty());
    }

    #[test]
    fn test_query_finds_exactly_the_overlapping_bricks() {
        let lib = cube_library(10.0);
        let world = grid_world(5, 100.0);
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);
        assert_eq!(index.len(), 25);

        // Around brick (1, 1): ids are x * 5 + z in insertion order.
        let target = Aabb::new(Vec3::new(95.0, -5.0, 95.0), Vec3::new(105.0, 5.0, 105.0));
        assert_eq!(collect(&index, &target), vec![6]);

        // Spanning two bricks along x.
        let target = Aabb::new(Vec3::new(95.0, -5.0, -5.0), Vec3::new(205.0, 5.0, 5.0));
        assert_eq!(collect(&index, &target), vec![5, 10]);
    }

    #[test]
    fn test_touching_counts_as_overlap() {
        let lib = cube_library(10.0);
        let world = grid_world(2, 100.0);
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);

        // Target's min.x equals brick 2's max.x (at 110).
        let target = Aabb::new(Vec3::new(110.0, 0.0, 0.0), Vec3::new(120.0, 5.0, 5.0));
        assert_eq!(collect(&index, &target), vec![2]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let lib = cube_library(10.0);
        let world = grid_world(4, 50.0);
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);
        let target = Aabb::new(Vec3::splat(-10.0), Vec3::splat(80.0));
        let first = collect(&index, &target);
        index.rebuild(&lib, &world);
        let second = collect(&index, &target);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_unknown_piece_stays_out_of_the_index() {
        let lib = cube_library(10.0);
        let mut world = WorldState::new();
        world.insert_brick(
            PieceId(99),
            Vec3::new(7.0, 8.0, 9.0),
            Quat::IDENTITY,
            0,
            BrickKind::Normal,
        );
        let known = world.insert_brick(
            PieceId(1),
            Vec3::new(100.0, 0.0, 0.0),
            Quat::IDENTITY,
            0,
            BrickKind::Normal,
        );
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);
        assert_eq!(index.len(), 1);
        assert!(collect(&index, &Aabb::new(Vec3::splat(6.0), Vec3::splat(10.0))).is_empty());
        let hits = collect(
            &index,
            &Aabb::new(Vec3::new(90.0, -5.0, -5.0), Vec3::new(110.0, 5.0, 5.0)),
        );
        assert_eq!(hits, vec![known.0]);
    }

    #[test]
    fn test_rotated_brick_bounds() {
        let mut lib = PieceLibrary::new();
        lib.insert(
            PieceDefinition::new(
                PieceId(2),
                "slab",
                vec![],
                vec![],
                PieceGeometry::cuboid(Vec3::new(-40.0, -4.0, -10.0), Vec3::new(40.0, 4.0, 10.0)),
            )
            .unwrap(),
        );
        let mut world = WorldState::new();
        world.insert_brick(
            PieceId(2),
            Vec3::ZERO,
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            0,
            BrickKind::Normal,
        );
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);

        // After the quarter turn the long axis lies along z.
        let along_z = Aabb::new(Vec3::new(-5.0, -2.0, 30.0), Vec3::new(5.0, 2.0, 50.0));
        assert_eq!(collect(&index, &along_z), vec![0]);
        let along_x = Aabb::new(Vec3::new(30.0, -2.0, -5.0), Vec3::new(50.0, 2.0, 5.0));
        assert!(collect(&index, &along_x).is_empty());
    }

    #[test]
    fn test_query_ray_candidates() {
        let lib = cube_library(10.0);
        let world = grid_world(3, 100.0);
        let mut index = WorldIndex::new();
        index.rebuild(&lib, &world);

        let mut hits = Vec::new();
        // Straight down onto brick (1, 1), id 4.
        index.query_ray(
            Vec3::new(100.0, 50.0, 100.0),
            Vec3::NEG_Y.recip(),
            |id| hits.push(id.0),
        );
        assert_eq!(hits, vec![4]);
    }
}
