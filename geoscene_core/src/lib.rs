//! geoscene Core - Geo-anchored Scene Placement Engine
//!
//! Keeps virtual objects pinned to real-world coordinates inside a drifting,
//! camera-tracked scene frame:
//! 1. **Projection**: WGS84 anchors → scene-local positions via geodesic distance + bearing
//! 2. **Scaling**: Distance-adaptive size strategies with a saturating adjusted distance
//! 3. **Footprints**: Extruded "blob" solids from geographic boundary rings
//! 4. **Routes**: Torus joints and midpoint-anchored box segments along a polyline
//!
//! The host calls [`NodeRegistry::update_all`] once per tick with a fresh
//! [`ReferenceFrame`]; every anchored node is re-projected and rescaled.

pub mod blob;
pub mod config;
pub mod error;
pub mod geometry;
pub mod node;
pub mod placement;
pub mod projector;
pub mod registry;
pub mod route;
pub mod scaling;
pub mod spatial;

// Re-export key types for convenience
pub use blob::{centroid, BlobPath, BlobPathBuilder, BlobShape, ExtrudedSolid};
pub use config::{BlobConfig, EngineConfig};
pub use error::{PlacementError, PlacementResult};
pub use geometry::{build_geometry, build_geometry_with, GeometryDescriptor, GeometryKind};
pub use node::{
    BillboardAxis, BillboardConfig, ContentTransform, PlacedNode, PlacementOptions, PlacementState,
    Transform, TransformCommit, RENDER_ORDER_BASE,
};
pub use placement::{render_order_hint, AdjustedDistance, UpdateOutcome};
pub use projector::{GeoProjector, LocationTranslation};
pub use registry::{NodeRegistry, TickReport};
pub use route::{build_route, Route, RouteStyle};
pub use scaling::{ScalingScheme, MIN_NORMAL_SCALE, MIN_SCALE};
pub use spatial::AnchorIndex;

pub use geoscene_env::{GeoCoordinate, LocalPosition, NodeHandle, ReferenceFrame};
