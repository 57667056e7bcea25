//! Piece definitions and the piece library.
//!
//! A piece is an immutable brick type: its connector lists (studs and
//! anti-studs), its collision geometry, and the eroded geometry variant
//! derived at load time. The library is built once from the piece catalog
//! and shared read-only with the collision engine.

pub mod catalog;
pub mod connector;
pub mod geometry;
pub mod library;

pub use catalog::{load_catalog, parse_catalog, CatalogError};
pub use connector::{Connector, ConnectorKind};
pub use geometry::{PieceGeometry, CONTACT_TOLERANCE};
pub use library::{PieceDefinition, PieceId, PieceLibrary};
