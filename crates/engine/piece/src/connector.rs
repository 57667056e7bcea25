use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which side of a mating pair a connector is.
///
/// Studs point out of a piece (usually up), anti-studs are the receiving
/// sockets (usually down). A placement mates one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorKind {
    Stud,
    AntiStud,
}

impl ConnectorKind {
    /// The kind this connector mates with.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            ConnectorKind::Stud => ConnectorKind::AntiStud,
            ConnectorKind::AntiStud => ConnectorKind::Stud,
        }
    }
}

/// A single attachment point in piece-local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    /// Offset from the piece origin.
    pub position: Vec3,
    /// Outward mating direction, unit length.
    pub direction: Vec3,
}

impl Connector {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
        }
    }
}
