//! H3 index of node anchors.
//!
//! Buckets anchored nodes by H3 cell so range queries only look at the
//! cells around the query point before the exact geodesic filter.

use crate::projector::GeoProjector;
use geoscene_env::{GeoCoordinate, NodeHandle};
use h3o::{CellIndex, LatLng, Resolution};
use std::collections::{HashMap, HashSet};

/// Rings beyond which a query falls back to scanning every anchor.
const MAX_RING: u32 = 64;

/// Spatial index over node anchors
#[derive(Debug, Clone)]
pub struct AnchorIndex {
    resolution: Resolution,
    cells: HashMap<CellIndex, HashSet<NodeHandle>>,
    anchors: HashMap<NodeHandle, (CellIndex, GeoCoordinate)>,
}

impl AnchorIndex {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            cells: HashMap::new(),
            anchors: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    fn cell_of(&self, coordinate: &GeoCoordinate) -> Option<CellIndex> {
        LatLng::new(coordinate.latitude(), coordinate.longitude())
            .ok()
            .map(|ll| ll.to_cell(self.resolution))
    }

    /// Indexes (or re-indexes) `handle` at `anchor`.
    pub fn insert(&mut self, handle: NodeHandle, anchor: GeoCoordinate) {
        self.remove(&handle);
        let Some(cell) = self.cell_of(&anchor) else {
            return;
        };
        self.cells.entry(cell).or_insert_with(HashSet::new).insert(handle);
        self.anchors.insert(handle, (cell, anchor));
    }

    pub fn remove(&mut self, handle: &NodeHandle) {
        if let Some((cell, _)) = self.anchors.remove(handle) {
            if let Some(set) = self.cells.get_mut(&cell) {
                set.remove(handle);
                // Clean up empty cells
                if set.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Handles whose anchors lie within `radius` metres of `center`,
    /// nearest first, with their surface distance.
    pub fn within(&self, center: &GeoCoordinate, radius: f64) -> Vec<(NodeHandle, f64)> {
        if !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }

        // Conservative ring count: hexagon centres are at least ~1.5 edges apart
        // Compared in f64 so huge radii never reach the integer cast
        let rings = (radius / self.resolution.edge_length_m()).ceil() + 1.0;
        let ring = (rings <= f64::from(MAX_RING)).then_some(rings as u32);

        let candidates: Vec<NodeHandle> = match (self.cell_of(center), ring) {
            (Some(cell), Some(k)) => cell
                .grid_disk_safe(k)
                .filter_map(|c| self.cells.get(&c))
                .flat_map(|set| set.iter().copied())
                .collect(),
            _ => self.anchors.keys().copied().collect(),
        };

        let mut hits: Vec<(NodeHandle, f64)> = candidates
            .into_iter()
            .filter_map(|handle| {
                let (_, anchor) = self.anchors.get(&handle)?;
                let d = GeoProjector::surface_distance(center, anchor);
                (d <= radius).then_some((handle, d))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits
    }
}
