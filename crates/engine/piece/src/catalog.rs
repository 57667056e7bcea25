//! Piece catalog import.
//!
//! The asset pipeline exports one JSON document per world: for every piece
//! it lists stud and anti-stud connectors, the collision geometry variant
//! (studs stripped), and the authored bounding box. Malformed entries are
//! skipped with a warning; only an unreadable or unparsable document fails
//! the load.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::connector::Connector;
use crate::geometry::PieceGeometry;
use crate::library::{PieceDefinition, PieceId, PieceLibrary};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    pieces: Vec<CatalogPiece>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPiece {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    studs: Vec<CatalogConnector>,
    #[serde(default)]
    anti_studs: Vec<CatalogConnector>,
    collision_geometry: CatalogGeometry,
    #[serde(default)]
    bounding_box: Option<CatalogBox>,
}

#[derive(Debug, Deserialize)]
struct CatalogConnector {
    x: f32,
    y: f32,
    z: f32,
    dx: f32,
    dy: f32,
    dz: f32,
}

/// Flat position triples plus triangle indices.
#[derive(Debug, Deserialize)]
struct CatalogGeometry {
    positions: Vec<f32>,
    indices: Vec<u32>,
}

/// Authored local-space box; may be wider than the collision mesh
/// (stud caps are stripped from the mesh only).
#[derive(Debug, Deserialize)]
struct CatalogBox {
    min: [f32; 3],
    max: [f32; 3],
}

/// Reads and parses a catalog file into a library.
pub fn load_catalog(path: &Path) -> Result<PieceLibrary, CatalogError> {
    let text = fs::read_to_string(path)?;
    parse_catalog(&text)
}

/// Parses a catalog document into a library.
pub fn parse_catalog(json: &str) -> Result<PieceLibrary, CatalogError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let mut library = PieceLibrary::new();
    for entry in file.pieces {
        let id = PieceId(entry.id);
        let Some(geometry) = convert_geometry(id, &entry.collision_geometry) else {
            continue;
        };
        let studs = convert_connectors(id, &entry.studs);
        let anti_studs = convert_connectors(id, &entry.anti_studs);
        let Some(mut def) = PieceDefinition::new(id, entry.name, studs, anti_studs, geometry)
        else {
            continue;
        };
        if let Some((min, max)) = entry.bounding_box.and_then(|b| convert_box(id, &b)) {
            def.widen_bounds(min, max);
        }
        library.insert(def);
    }
    Ok(library)
}

fn convert_box(id: PieceId, raw: &CatalogBox) -> Option<(Vec3, Vec3)> {
    let min = Vec3::from_array(raw.min);
    let max = Vec3::from_array(raw.max);
    if !min.is_finite() || !max.is_finite() || min.cmpgt(max).any() {
        warn!(piece = %id, "malformed bounding box ignored");
        return None;
    }
    Some((min, max))
}

fn convert_geometry(id: PieceId, raw: &CatalogGeometry) -> Option<PieceGeometry> {
    if raw.positions.len() % 3 != 0 {
        warn!(piece = %id, "position array is not a multiple of three, skipping piece");
        return None;
    }
    let positions: Vec<Vec3> = raw
        .positions
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect();
    let vertex_count = positions.len() as u32;
    if raw.indices.iter().any(|&i| i >= vertex_count) {
        warn!(piece = %id, "triangle index out of range, skipping piece");
        return None;
    }
    Some(PieceGeometry::new(positions, raw.indices.clone()))
}

fn convert_connectors(id: PieceId, raw: &[CatalogConnector]) -> Vec<Connector> {
    raw.iter()
        .filter_map(|c| {
            let position = Vec3::new(c.x, c.y, c.z);
            let direction = Vec3::new(c.dx, c.dy, c.dz);
            if !position.is_finite() || !direction.is_finite() {
                warn!(piece = %id, "non-finite connector dropped");
                return None;
            }
            if direction.length_squared() < f32::EPSILON {
                warn!(piece = %id, "zero-direction connector dropped");
                return None;
            }
            Some(Connector::new(position, direction.normalize()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"{
        "pieces": [
            {
                "id": 3001,
                "name": "brick-2x4",
                "studs": [{"x": 0.0, "y": 12.0, "z": 0.0, "dx": 0.0, "dy": 1.0, "dz": 0.0}],
                "antiStuds": [{"x": 0.0, "y": -12.0, "z": 0.0, "dx": 0.0, "dy": -1.0, "dz": 0.0}],
                "collisionGeometry": {
                    "positions": [-20.0, -12.0, -40.0,
                                   20.0, -12.0, -40.0,
                                   20.0,  12.0, -40.0,
                                  -20.0, -12.0,  40.0],
                    "indices": [0, 2, 1, 0, 1, 3]
                },
                "boundingBox": { "min": [-20.0, -12.0, -40.0], "max": [20.0, 16.0, 40.0] }
            },
            {
                "id": 3002,
                "name": "broken",
                "collisionGeometry": { "positions": [1.0, 2.0], "indices": [] }
            },
            {
                "id": 3003,
                "name": "bad-connector",
                "studs": [{"x": 0.0, "y": 0.0, "z": 0.0, "dx": 0.0, "dy": 0.0, "dz": 0.0}],
                "collisionGeometry": {
                    "positions": [0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 10.0],
                    "indices": [0, 2, 1]
                },
                "boundingBox": { "min": [5.0, 5.0, 5.0], "max": [-5.0, -5.0, -5.0] }
            }
        ]
    }"#;

    #[test]
    fn test_parse_catalog_skips_bad_entries() {
        let lib = parse_catalog(CATALOG).unwrap();
        assert_eq!(lib.len(), 2);

        let brick = lib.get(PieceId(3001)).unwrap();
        assert_eq!(brick.name, "brick-2x4");
        assert_eq!(brick.studs.len(), 1);
        assert_eq!(brick.anti_studs.len(), 1);
        assert_eq!(brick.geometry.triangle_count(), 2);

        // Geometry survives but the zero-direction stud is dropped.
        let bad = lib.get(PieceId(3003)).unwrap();
        assert!(bad.studs.is_empty());

        assert!(lib.get(PieceId(3002)).is_none());
    }

    #[test]
    fn test_authored_box_widens_bounds() {
        let lib = parse_catalog(CATALOG).unwrap();

        // The stud-inclusive box raises max.y above the mesh's 12.
        let brick = lib.get(PieceId(3001)).unwrap();
        assert_eq!(brick.local_min, Vec3::new(-20.0, -12.0, -40.0));
        assert_eq!(brick.local_max, Vec3::new(20.0, 16.0, 40.0));

        // An inverted box is ignored; bounds stay mesh-derived.
        let bad = lib.get(PieceId(3003)).unwrap();
        assert_eq!(bad.local_min, Vec3::ZERO);
        assert_eq!(bad.local_max, Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn test_connector_directions_are_normalized() {
        let raw = [CatalogConnector {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            dx: 0.0,
            dy: 3.0,
            dz: 0.0,
        }];
        let converted = convert_connectors(PieceId(1), &raw);
        assert_eq!(converted.len(), 1);
        assert!((converted[0].direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let lib = load_catalog(file.path()).unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_unparsable_document_fails() {
        assert!(matches!(
            parse_catalog("not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
