use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Inward erosion distance for ghost collision meshes, in world units.
///
/// A candidate resting exactly on a neighbour (stud seated in a socket)
/// must not count as overlap. Eroding the candidate's geometry by this
/// margin turns surface contact into clearance while real interpenetration
/// still intersects.
pub const CONTACT_TOLERANCE: f32 = 0.08;

/// Quantization step when welding vertices that share a position.
const WELD_STEP: f32 = 1e-3;

/// Winding for the twelve triangles of an axis-aligned box, outward faces.
const CUBOID_INDICES: [u32; 36] = [
    0, 3, 2, 0, 2, 1, // -Z
    4, 5, 6, 4, 6, 7, // +Z
    0, 4, 7, 0, 7, 3, // -X
    1, 2, 6, 1, 6, 5, // +X
    0, 1, 5, 0, 5, 4, // -Y
    3, 7, 6, 3, 6, 2, // +Y
];

/// Triangle-soup collision geometry in piece-local space.
///
/// Exported collision variants exclude stud cylinders, so a box-like piece
/// really is a box here. Indices are triples into `positions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PieceGeometry {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl PieceGeometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Axis-aligned box spanning `min..max`, twelve outward-facing triangles.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let positions = vec![
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        Self {
            positions,
            indices: CUBOID_INDICES.to_vec(),
        }
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when there is nothing to collide with.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    /// Bounds of all vertices, or `None` for empty geometry.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for &p in &self.positions[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }

    /// Copy with every vertex displaced inward by [`CONTACT_TOLERANCE`]
    /// along its smoothed normal. Used only for ghost candidates; placed
    /// bricks keep the exact geometry.
    pub fn eroded(&self) -> PieceGeometry {
        let normals = self.smoothed_normals();
        let positions = self
            .positions
            .iter()
            .zip(&normals)
            .map(|(&p, &n)| p - n * CONTACT_TOLERANCE)
            .collect();
        PieceGeometry {
            positions,
            indices: self.indices.clone(),
        }
    }

    /// Per-vertex normals averaged across all triangles meeting at a
    /// position. Vertices are welded by quantized position first, so
    /// duplicated corners from unindexed exports erode uniformly. Cross
    /// products are accumulated unnormalized, which weights by triangle
    /// area. Zero-length results fall back to `+Y`.
    fn smoothed_normals(&self) -> Vec<Vec3> {
        let mut groups: HashMap<(i64, i64, i64), usize> = HashMap::new();
        let mut group_of = Vec::with_capacity(self.positions.len());
        let mut accum: Vec<Vec3> = Vec::new();
        for &p in &self.positions {
            let id = *groups.entry(weld_key(p)).or_insert_with(|| {
                accum.push(Vec3::ZERO);
                accum.len() - 1
            });
            group_of.push(id);
        }

        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= self.positions.len() || b >= self.positions.len() || c >= self.positions.len()
            {
                continue;
            }
            let cross = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            accum[group_of[a]] += cross;
            accum[group_of[b]] += cross;
            accum[group_of[c]] += cross;
        }

        group_of
            .iter()
            .map(|&g| {
                let n = accum[g];
                if n.length_squared() > f32::EPSILON {
                    n.normalize()
                } else {
                    Vec3::Y
                }
            })
            .collect()
    }
}

#[inline]
fn weld_key(p: Vec3) -> (i64, i64, i64) {
    (
        (p.x / WELD_STEP).round() as i64,
        (p.y / WELD_STEP).round() as i64,
        (p.z / WELD_STEP).round() as i64,
    )
}
