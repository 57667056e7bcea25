use brickworld_world::{Player, CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};
use glam::Vec3;
use tracing::warn;

use crate::aabb::Aabb;
use crate::ghost::capsule_aabb;
use crate::index::WorldIndex;

/// Push-out passes per tick. Overlap remaining after the last pass
/// carries into the next tick.
pub const RESOLVE_ITERATIONS: usize = 3;

/// Correction candidate from one capsule/box pair.
struct Correction {
    normal: Vec3,
    penetration: f32,
}

/// Pushes a player capsule out of the brick world.
///
/// Each pass queries the index with the capsule's box, computes the
/// penetration against every overlapping brick box, and applies only the
/// single deepest correction: position moves along the contact normal,
/// velocity loses its inward component, and an upward-facing contact
/// grounds the player if they were not moving up when the tick started.
pub(crate) fn resolve(index: &WorldIndex, player: &mut Player, iterations: usize) {
    if index.is_empty() {
        return;
    }
    if !player.position.is_finite() || !player.velocity.is_finite() {
        warn!("non-finite player state, skipping capsule resolution");
        return;
    }

    let descending = player.velocity.y <= 0.0;
    for _ in 0..iterations {
        let bounds = capsule_aabb(player.position);
        let mut best: Option<Correction> = None;
        index.query(&bounds, |_, brick_box| {
            if let Some(c) = capsule_box_penetration(player.position, brick_box) {
                if best.as_ref().map_or(true, |b| c.penetration > b.penetration) {
                    best = Some(c);
                }
            }
        });

        let Some(c) = best else {
            break;
        };
        player.position += c.normal * c.penetration;
        let inward = player.velocity.dot(c.normal);
        if inward < 0.0 {
            player.velocity -= c.normal * inward;
        }
        if c.normal.y > 0.5 && descending {
            player.grounded = true;
        }
    }
}

/// Closest-point test between a vertical capsule at `center` and a box.
///
/// The box point nearest the capsule axis is the center clamped into the
/// box; the axis point nearest it is that point's height clamped into the
/// segment. Penetration exists when the two are closer than the radius.
fn capsule_box_penetration(center: Vec3, aabb: &Aabb) -> Option<Correction> {
    let box_point = center.clamp(aabb.min, aabb.max);
    let seg_y = box_point.y.clamp(
        center.y - CAPSULE_HALF_HEIGHT,
        center.y + CAPSULE_HALF_HEIGHT,
    );
    let seg_point = Vec3::new(center.x, seg_y, center.z);

    let delta = box_point - seg_point;
    let dist_sq = delta.length_squared();
    if dist_sq >= CAPSULE_RADIUS * CAPSULE_RADIUS {
        return None;
    }
    let dist = dist_sq.sqrt();
    if dist > 1e-6 {
        Some(Correction {
            normal: -delta / dist,
            penetration: CAPSULE_RADIUS - dist,
        })
    } else {
        // Axis point inside the box: no usable direction, push straight up.
        Some(Correction {
            normal: Vec3::Y,
            penetration: CAPSULE_RADIUS,
        })
    }
}
