use std::collections::HashMap;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::connector::{Connector, ConnectorKind};
use crate::geometry::PieceGeometry;

/// Identifier of a piece type in the library.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable data for one piece type: connectors, exact collision geometry,
/// the eroded variant derived at load, and local-space bounds.
#[derive(Debug, Clone)]
pub struct PieceDefinition {
    pub id: PieceId,
    pub name: String,
    pub studs: Vec<Connector>,
    pub anti_studs: Vec<Connector>,
    pub geometry: PieceGeometry,
    pub eroded: PieceGeometry,
    pub local_min: Vec3,
    pub local_max: Vec3,
}

impl PieceDefinition {
    /// Builds a definition, deriving the eroded geometry and local bounds.
    ///
    /// Returns `None` when the collision geometry is unusable; the caller
    /// skips the piece rather than failing the whole load.
    pub fn new(
        id: PieceId,
        name: impl Into<String>,
        studs: Vec<Connector>,
        anti_studs: Vec<Connector>,
        geometry: PieceGeometry,
    ) -> Option<Self> {
        if geometry.is_empty() {
            warn!(piece = %id, "piece has no collision geometry, skipping");
            return None;
        }
        let (local_min, local_max) = geometry.bounds()?;
        if !local_min.is_finite() || !local_max.is_finite() {
            warn!(piece = %id, "piece geometry has non-finite vertices, skipping");
            return None;
        }
        let eroded = geometry.eroded();
        Some(Self {
            id,
            name: name.into(),
            studs,
            anti_studs,
            geometry,
            eroded,
            local_min,
            local_max,
        })
    }

    /// Widens the local bounds to include an authored bounding box.
    ///
    /// The authored box may extend past the collision mesh (stud caps are
    /// stripped from the mesh only). Bounds never shrink: broad-phase
    /// boxes must enclose the mesh.
    pub fn widen_bounds(&mut self, min: Vec3, max: Vec3) {
        self.local_min = self.local_min.min(min);
        self.local_max = self.local_max.max(max);
    }

    /// Connector list for one side of a mating pair.
    #[inline]
    pub fn connectors(&self, kind: ConnectorKind) -> &[Connector] {
        match kind {
            ConnectorKind::Stud => &self.studs,
            ConnectorKind::AntiStud => &self.anti_studs,
        }
    }
}

/// Read-only repository of piece definitions.
///
/// Built once at startup and then shared by reference with the collision
/// engine; queries never mutate it.
#[derive(Debug, Default)]
pub struct PieceLibrary {
    pieces: HashMap<PieceId, PieceDefinition>,
}

impl PieceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition, replacing any previous one with the same id.
    pub fn insert(&mut self, def: PieceDefinition) {
        if self.pieces.insert(def.id, def).is_some() {
            warn!("duplicate piece id replaced an earlier definition");
        }
    }

    #[inline]
    pub fn get(&self, id: PieceId) -> Option<&PieceDefinition> {
        self.pieces.get(&id)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PieceDefinition> {
        self.pieces.values()
    }
}
