use std::collections::HashMap;

use glam::{Quat, Vec3};
use piece::{PieceGeometry, PieceId, PieceLibrary};
use tracing::warn;

use crate::aabb::Aabb;

/// Leaf capacity of the per-mesh triangle tree.
const LEAF_TRIANGLES: usize = 8;

#[derive(Debug, Clone)]
enum MeshNode {
    Leaf { aabb: Aabb, start: u32, count: u32 },
    Internal { aabb: Aabb, left: u32, right: u32 },
}

impl MeshNode {
    #[inline]
    fn aabb(&self) -> &Aabb {
        match self {
            MeshNode::Leaf { aabb, .. } | MeshNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Triangle mesh with a bounding volume hierarchy, built once per piece
/// geometry and queried read-only afterwards.
///
/// Intersection is surface based: two meshes intersect when some triangle
/// pair does. Callers that need to catch full containment (a mesh floating
/// strictly inside another) layer perturbed queries on top, as the ghost
/// tester does.
#[derive(Debug, Clone)]
pub struct CollisionMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    nodes: Vec<MeshNode>,
    /// Triangle indices permuted so every leaf owns a contiguous range.
    order: Vec<u32>,
    root: u32,
}

impl CollisionMesh {
    /// Builds the hierarchy. Returns `None` when the soup holds no usable
    /// triangle (empty or out-of-range indices only).
    pub fn build(geometry: &PieceGeometry) -> Option<CollisionMesh> {
        let vertices = geometry.positions.clone();
        let mut triangles = Vec::with_capacity(geometry.triangle_count());
        let limit = vertices.len() as u32;
        for tri in geometry.indices.chunks_exact(3) {
            if tri[0] < limit && tri[1] < limit && tri[2] < limit {
                triangles.push([tri[0], tri[1], tri[2]]);
            }
        }
        if triangles.is_empty() {
            return None;
        }

        let refs: Vec<(Aabb, Vec3)> = triangles
            .iter()
            .map(|t| {
                let p0 = vertices[t[0] as usize];
                let p1 = vertices[t[1] as usize];
                let p2 = vertices[t[2] as usize];
                let aabb = Aabb::new(p0.min(p1).min(p2), p0.max(p1).max(p2));
                (aabb, aabb.center())
            })
            .collect();

        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut nodes = Vec::new();
        let len = order.len();
        let root = build_range(&refs, &mut order, &mut nodes, 0, len);
        Some(CollisionMesh {
            vertices,
            triangles,
            nodes,
            order,
            root,
        })
    }

    /// Local-space bounds of the whole mesh.
    pub fn bounds(&self) -> Aabb {
        *self.nodes[self.root as usize].aabb()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when any triangle of `self` posed at (`self_rotation`,
    /// `self_position`) intersects any triangle of `other` at its pose.
    /// Touching counts as intersecting.
    pub fn intersects_mesh(
        &self,
        self_rotation: Quat,
        self_position: Vec3,
        other: &CollisionMesh,
        other_rotation: Quat,
        other_position: Vec3,
    ) -> bool {
        // Work in self-local space: one relative transform maps other-local
        // points into it, so only one side is ever transformed.
        let inv = self_rotation.inverse();
        let rel_rotation = (inv * other_rotation).normalize();
        let rel_position = inv * (other_position - self_position);

        let mut stack = vec![(self.root, other.root)];
        while let Some((ai, bi)) = stack.pop() {
            let a = &self.nodes[ai as usize];
            let b = &other.nodes[bi as usize];
            let b_box = b.aabb().transformed(rel_rotation, rel_position);
            if !a.aabb().overlaps(&b_box) {
                continue;
            }
            match (a, b) {
                (
                    MeshNode::Leaf {
                        start: sa,
                        count: ca,
                        ..
                    },
                    MeshNode::Leaf {
                        start: sb,
                        count: cb,
                        ..
                    },
                ) => {
                    if self.leaves_intersect(*sa, *ca, other, *sb, *cb, rel_rotation, rel_position)
                    {
                        return true;
                    }
                }
                (MeshNode::Internal { left, right, .. }, MeshNode::Leaf { .. }) => {
                    stack.push((*left, bi));
                    stack.push((*right, bi));
                }
                (MeshNode::Leaf { .. }, MeshNode::Internal { left, right, .. }) => {
                    stack.push((ai, *left));
                    stack.push((ai, *right));
                }
                (
                    MeshNode::Internal {
                        aabb: a_box,
                        left: al,
                        right: ar,
                    },
                    MeshNode::Internal {
                        aabb: b_node_box,
                        left: bl,
                        right: br,
                    },
                ) => {
                    // Split the larger node; volume does not change under a
                    // rigid transform, so local-space volumes compare fine.
                    if volume(a_box) >= volume(b_node_box) {
                        stack.push((*al, bi));
                        stack.push((*ar, bi));
                    } else {
                        stack.push((ai, *bl));
                        stack.push((ai, *br));
                    }
                }
            }
        }
        false
    }

    /// Nearest hit distance of a local-space ray, `None` on a miss.
    /// `direction` should be unit length; the distance is measured along it.
    pub fn intersects_ray(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let inv_dir = direction.recip();
        let mut best: Option<f32> = None;
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i as usize];
            match node.aabb().ray_entry(origin, inv_dir) {
                None => continue,
                Some(entry) if best.is_some_and(|b| entry > b) => continue,
                Some(_) => {}
            }
            match node {
                MeshNode::Leaf { start, count, .. } => {
                    for &ti in &self.order[*start as usize..(*start + *count) as usize] {
                        let tri = self.triangle(ti);
                        if let Some(hit) = ray_triangle(origin, direction, &tri) {
                            if best.map_or(true, |b| hit < b) {
                                best = Some(hit);
                            }
                        }
                    }
                }
                MeshNode::Internal { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
        best
    }

    #[inline]
    fn triangle(&self, i: u32) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[i as usize];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    #[allow(clippy::too_many_arguments)]
    fn leaves_intersect(
        &self,
        sa: u32,
        ca: u32,
        other: &CollisionMesh,
        sb: u32,
        cb: u32,
        rel_rotation: Quat,
        rel_position: Vec3,
    ) -> bool {
        for &tj in &other.order[sb as usize..(sb + cb) as usize] {
            let [b0, b1, b2] = other.triangle(tj);
            let tb = [
                rel_rotation * b0 + rel_position,
                rel_rotation * b1 + rel_position,
                rel_rotation * b2 + rel_position,
            ];
            for &ti in &self.order[sa as usize..(sa + ca) as usize] {
                if tri_tri_intersect(&self.triangle(ti), &tb) {
                    return true;
                }
            }
        }
        false
    }
}

fn build_range(
    refs: &[(Aabb, Vec3)],
    order: &mut [u32],
    nodes: &mut Vec<MeshNode>,
    start: usize,
    end: usize,
) -> u32 {
    let mut aabb = refs[order[start] as usize].0;
    for &i in &order[start + 1..end] {
        aabb = aabb.union(&refs[i as usize].0);
    }
    let count = end - start;
    if count <= LEAF_TRIANGLES {
        nodes.push(MeshNode::Leaf {
            aabb,
            start: start as u32,
            count: count as u32,
        });
        return (nodes.len() - 1) as u32;
    }

    let axis = largest_axis(aabb.size());
    order[start..end].sort_unstable_by(|&a, &b| {
        refs[a as usize].1[axis].total_cmp(&refs[b as usize].1[axis])
    });
    let mid = start + count / 2;
    let left = build_range(refs, order, nodes, start, mid);
    let right = build_range(refs, order, nodes, mid, end);
    nodes.push(MeshNode::Internal { aabb, left, right });
    (nodes.len() - 1) as u32
}

#[inline]
pub(crate) fn largest_axis(size: Vec3) -> usize {
    if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    }
}

#[inline]
fn volume(aabb: &Aabb) -> f32 {
    let s = aabb.size();
    s.x * s.y * s.z
}

/// Separating axis test over the two face normals and the nine edge cross
/// products. Touching projections count as intersecting. Coplanar pairs
/// project identically on every available axis and therefore also count as
/// intersecting.
fn tri_tri_intersect(a: &[Vec3; 3], b: &[Vec3; 3]) -> bool {
    let ea = [a[1] - a[0], a[2] - a[1], a[0] - a[2]];
    let eb = [b[1] - b[0], b[2] - b[1], b[0] - b[2]];

    if separated(a, b, ea[0].cross(ea[1])) || separated(a, b, eb[0].cross(eb[1])) {
        return false;
    }
    for i in 0..3 {
        for j in 0..3 {
            if separated(a, b, ea[i].cross(eb[j])) {
                return false;
            }
        }
    }
    true
}

#[inline]
fn separated(a: &[Vec3; 3], b: &[Vec3; 3], axis: Vec3) -> bool {
    // A near-zero axis (parallel edges, degenerate triangle) proves nothing.
    if axis.length_squared() < 1e-12 {
        return false;
    }
    let (a_min, a_max) = project(a, axis);
    let (b_min, b_max) = project(b, axis);
    a_max < b_min || b_max < a_min
}

#[inline]
fn project(t: &[Vec3; 3], axis: Vec3) -> (f32, f32) {
    let d0 = t[0].dot(axis);
    let d1 = t[1].dot(axis);
    let d2 = t[2].dot(axis);
    (d0.min(d1).min(d2), d0.max(d1).max(d2))
}

/// Moller-Trumbore ray/triangle intersection, front and back faces alike.
fn ray_triangle(origin: Vec3, direction: Vec3, tri: &[Vec3; 3]) -> Option<f32> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = direction.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

/// A piece's two mesh variants: exact for placed bricks, eroded for ghost
/// candidates.
#[derive(Debug, Clone)]
pub struct MeshPair {
    pub exact: CollisionMesh,
    pub eroded: CollisionMesh,
}

/// Prebuilt collision meshes for every piece in a library.
///
/// Built once right after the catalog loads; pieces without usable
/// triangles are left out and every query treats them permissively.
#[derive(Debug, Default)]
pub struct PieceMeshes {
    meshes: HashMap<PieceId, MeshPair>,
}

impl PieceMeshes {
    pub fn build(pieces: &PieceLibrary) -> Self {
        let mut meshes = HashMap::new();
        for def in pieces.iter() {
            let (Some(exact), Some(eroded)) = (
                CollisionMesh::build(&def.geometry),
                CollisionMesh::build(&def.eroded),
            ) else {
                warn!(piece = %def.id, "piece has no usable collision triangles");
                continue;
            };
            meshes.insert(def.id, MeshPair { exact, eroded });
        }
        Self { meshes }
    }

    #[inline]
    pub fn get(&self, id: PieceId) -> Option<&MeshPair> {
        self.meshes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> CollisionMesh {
        CollisionMesh::build(&PieceGeometry::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)))
            .expect("cube mesh")
    }

    fn check_node(mesh: &CollisionMesh, index: u32) {
        match &mesh.nodes[index as usize] {
            MeshNode::Leaf { aabb, start, count } => {
                for &ti in &mesh.order[*start as usize..(*start + *count) as usize] {
                    let tri = mesh.triangle(ti);
                    for v in tri {
                        assert!(aabb.contains_point(v));
                    }
                }
            }
            MeshNode::Internal { aabb, left, right } => {
                for child in [*left, *right] {
                    let child_box = mesh.nodes[child as usize].aabb();
                    assert!(aabb.contains_point(child_box.min));
                    assert!(aabb.contains_point(child_box.max));
                    check_node(mesh, child);
                }
            }
        }
    }

    #[test]
    fn test_build_cube() {
        let mesh = unit_cube();
        assert_eq!(mesh.triangle_count(), 12);
        let b = mesh.bounds();
        assert_eq!(b.min, Vec3::splat(-0.5));
        assert_eq!(b.max, Vec3::splat(0.5));
        check_node(&mesh, mesh.root);
    }

    #[test]
    fn test_node_boxes_contain_triangles_on_larger_mesh() {
        // Enough triangles to force several internal levels.
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for i in 0..64 {
            let base = positions.len() as u32;
            let x = (i % 8) as f32 * 3.0;
            let z = (i / 8) as f32 * 3.0;
            positions.push(Vec3::new(x, 0.0, z));
            positions.push(Vec3::new(x + 1.0, 0.0, z));
            positions.push(Vec3::new(x, 0.0, z + 1.0));
            indices.extend([base, base + 2, base + 1]);
        }
        let mesh = CollisionMesh::build(&PieceGeometry::new(positions, indices)).unwrap();
        assert_eq!(mesh.triangle_count(), 64);
        check_node(&mesh, mesh.root);
    }

    #[test]
    fn test_mesh_intersection_separated_and_overlapping() {
        let a = unit_cube();
        let b = unit_cube();
        assert!(!a.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &b,
            Quat::IDENTITY,
            Vec3::new(2.0, 0.0, 0.0)
        ));
        assert!(a.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &b,
            Quat::IDENTITY,
            Vec3::new(0.6, 0.0, 0.0)
        ));
    }

    #[test]
    fn test_mesh_intersection_exact_touch() {
        let a = unit_cube();
        let b = unit_cube();
        // Faces meeting exactly: projections touch on the face axis, which
        // is not a separation.
        assert!(a.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &b,
            Quat::IDENTITY,
            Vec3::new(1.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn test_mesh_intersection_rotated() {
        let a = unit_cube();
        let b = unit_cube();
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        // The rotated cube's corner reaches past x = 0.5.
        assert!(a.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &b,
            rot,
            Vec3::new(1.1, 0.0, 0.0)
        ));
        assert!(!a.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &b,
            rot,
            Vec3::new(1.3, 0.0, 0.0)
        ));
    }

    #[test]
    fn test_nested_surfaces_do_not_intersect() {
        // Surface semantics: a mesh strictly inside another shares no
        // triangle intersections. The ghost tester's nudges exist to catch
        // exactly this.
        let outer = unit_cube();
        let inner = CollisionMesh::build(&PieceGeometry::cuboid(
            Vec3::splat(-0.2),
            Vec3::splat(0.2),
        ))
        .unwrap();
        assert!(!outer.intersects_mesh(
            Quat::IDENTITY,
            Vec3::ZERO,
            &inner,
            Quat::IDENTITY,
            Vec3::ZERO
        ));
    }

    #[test]
    fn test_ray_hits_nearest_face() {
        let mesh = unit_cube();
        let hit = mesh
            .intersects_ray(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y)
            .expect("hit");
        assert!((hit - 4.5).abs() < 1e-5);
        assert!(mesh
            .intersects_ray(Vec3::new(3.0, 5.0, 0.0), Vec3::NEG_Y)
            .is_none());
        // Pointing away.
        assert!(mesh.intersects_ray(Vec3::new(0.0, 5.0, 0.0), Vec3::Y).is_none());
    }

    #[test]
    fn test_piece_meshes_skip_unusable() {
        let mut lib = PieceLibrary::new();
        let def = piece::PieceDefinition::new(
            PieceId(1),
            "cube",
            vec![],
            vec![],
            PieceGeometry::cuboid(Vec3::splat(-20.0), Vec3::splat(20.0)),
        )
        .unwrap();
        lib.insert(def);
        let meshes = PieceMeshes::build(&lib);
        assert_eq!(meshes.len(), 1);
        assert!(meshes.get(PieceId(1)).is_some());
        assert!(meshes.get(PieceId(2)).is_none());
    }
}
