use glam::Vec3;
use piece::{Connector, PieceDefinition, PieceGeometry, PieceId, PieceLibrary};

/// Stud pitch of the brick system, world units.
const PITCH: f32 = 20.0;

/// Protected ground slab seeded at startup.
pub const BASEPLATE: PieceId = PieceId(1);
pub const BRICK_2X2: PieceId = PieceId(2);
pub const BRICK_2X4: PieceId = PieceId(3);
pub const PLATE_1X1: PieceId = PieceId(4);

/// Builtin piece set used when no catalog file is configured.
pub fn builtin_library() -> anyhow::Result<PieceLibrary> {
    let mut lib = PieceLibrary::new();
    define(&mut lib, BASEPLATE, "baseplate-16x16", 16, 16, 8.0, false)?;
    define(&mut lib, BRICK_2X2, "brick-2x2", 2, 2, 24.0, true)?;
    define(&mut lib, BRICK_2X4, "brick-2x4", 2, 4, 24.0, true)?;
    define(&mut lib, PLATE_1X1, "plate-1x1", 1, 1, 8.0, true)?;
    Ok(lib)
}

/// Defines a rectangular piece `nx` by `nz` studs and `height` units tall.
///
/// Studs cover the top face; anti-studs mirror them on the bottom face when
/// `underside` is set. The baseplate has no underside so nothing can mate
/// below the ground.
fn define(
    lib: &mut PieceLibrary,
    id: PieceId,
    name: &str,
    nx: u32,
    nz: u32,
    height: f32,
    underside: bool,
) -> anyhow::Result<()> {
    let half = Vec3::new(
        nx as f32 * PITCH / 2.0,
        height / 2.0,
        nz as f32 * PITCH / 2.0,
    );
    let studs = connector_grid(nx, nz, half.y, Vec3::Y);
    let anti_studs = if underside {
        connector_grid(nx, nz, -half.y, Vec3::NEG_Y)
    } else {
        Vec::new()
    };
    let geometry = PieceGeometry::cuboid(-half, half);
    let def = PieceDefinition::new(id, name, studs, anti_studs, geometry)
        .ok_or_else(|| anyhow::anyhow!("builtin piece {name} has unusable geometry"))?;
    lib.insert(def);
    Ok(())
}

/// Connector grid centered on the piece origin at stud pitch.
fn connector_grid(nx: u32, nz: u32, y: f32, direction: Vec3) -> Vec<Connector> {
    let mut out = Vec::with_capacity((nx * nz) as usize);
    for ix in 0..nx {
        for iz in 0..nz {
            let x = (ix as f32 - (nx as f32 - 1.0) / 2.0) * PITCH;
            let z = (iz as f32 - (nz as f32 - 1.0) / 2.0) * PITCH;
            out.push(Connector::new(Vec3::new(x, y, z), direction));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_library_loads() {
        let lib = builtin_library().unwrap();
        assert_eq!(lib.len(), 4);
        assert!(lib.get(BASEPLATE).is_some());
        assert!(lib.get(BRICK_2X4).is_some());
    }

    #[test]
    fn test_baseplate_has_no_underside() {
        let lib = builtin_library().unwrap();
        let plate = lib.get(BASEPLATE).unwrap();
        assert_eq!(plate.studs.len(), 256);
        assert!(plate.anti_studs.is_empty());
        assert_eq!(plate.local_min, Vec3::new(-160.0, -4.0, -160.0));
        assert_eq!(plate.local_max, Vec3::new(160.0, 4.0, 160.0));
    }

    #[test]
    fn test_brick_connectors_sit_on_faces() {
        let lib = builtin_library().unwrap();
        let brick = lib.get(BRICK_2X4).unwrap();
        assert_eq!(brick.studs.len(), 8);
        assert_eq!(brick.anti_studs.len(), 8);
        for stud in &brick.studs {
            assert_eq!(stud.position.y, 12.0);
            assert_eq!(stud.direction, Vec3::Y);
            assert!(stud.position.x.abs() <= 10.0);
            assert!(stud.position.z.abs() <= 30.0);
        }
        for anti in &brick.anti_studs {
            assert_eq!(anti.position.y, -12.0);
            assert_eq!(anti.direction, Vec3::NEG_Y);
        }
    }
}
