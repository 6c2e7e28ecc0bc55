//! The node registry: the host-facing driver surface.
//!
//! The host places nodes, calls [`NodeRegistry::update_all`] once per tick
//! with a fresh [`ReferenceFrame`], and reads back transforms and draw
//! order. Nodes placed before reference data exists wait as `Pending` and
//! get their setup update on the first tick that can serve it.

use crate::config::EngineConfig;
use crate::error::{PlacementError, PlacementResult};
use crate::node::{PlacedNode, PlacementState};
use crate::placement::UpdateOutcome;
use crate::spatial::AnchorIndex;
use geoscene_env::{GeoCoordinate, NodeHandle, ReferenceFrame};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Called with the handle and tag of a selected node.
pub type SelectionCallback = Box<dyn FnMut(NodeHandle, Option<&str>) + Send>;

/// Called after every committed node update.
pub type UpdateCallback = Box<dyn FnMut(&PlacedNode) + Send>;

/// Per-tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Pending nodes that received their setup update (or were pinned)
    pub placed: usize,
    pub updated: usize,
    pub deferred: usize,
    pub pinned: usize,
    pub frozen: usize,
    /// Nodes still waiting for reference data
    pub pending: usize,
}

/// Owns every placed node, in insertion order.
pub struct NodeRegistry {
    config: EngineConfig,
    nodes: BTreeMap<u64, PlacedNode>,
    sequence: HashMap<NodeHandle, u64>,
    next_sequence: u64,
    index: AnchorIndex,
    on_node_selected: Option<SelectionCallback>,
    on_node_updated: Option<UpdateCallback>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl NodeRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            index: AnchorIndex::new(config.spatial_resolution),
            config,
            nodes: BTreeMap::new(),
            sequence: HashMap::new(),
            next_sequence: 0,
            on_node_selected: None,
            on_node_updated: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, handle: &NodeHandle) -> Option<&PlacedNode> {
        self.sequence.get(handle).and_then(|seq| self.nodes.get(seq))
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedNode> {
        self.nodes.values()
    }

    /// Registers the selection callback.
    pub fn on_node_selected<F>(&mut self, callback: F)
    where
        F: FnMut(NodeHandle, Option<&str>) + Send + 'static,
    {
        self.on_node_selected = Some(Box::new(callback));
    }

    /// Registers the per-commit completion callback.
    pub fn on_node_updated<F>(&mut self, callback: F)
    where
        F: FnMut(&PlacedNode) + Send + 'static,
    {
        self.on_node_updated = Some(Box::new(callback));
    }

    // ========================================================================
    // PLACEMENT
    // ========================================================================

    /// Adds a node. It stays `Pending` until the next tick with enough
    /// reference data gives it a setup update.
    pub fn place(&mut self, mut node: PlacedNode) -> NodeHandle {
        let handle = node.handle;
        if self.sequence.contains_key(&handle) {
            debug!("Replacing node {}", handle);
            let _ = self.remove(&handle);
        }

        node.state = PlacementState::Pending;
        if let Some(anchor) = node.anchor {
            self.index.insert(handle, anchor);
        }
        info!(
            "Placed {} node {} at {}",
            node.kind.name(),
            handle,
            node.anchor.map_or_else(|| "viewer".to_string(), |a| a.to_string())
        );

        let seq = self.next_sequence;
        self.next_sequence += 1;
        self.sequence.insert(handle, seq);
        self.nodes.insert(seq, node);
        handle
    }

    /// Places `node` unanchored, pinned at the viewer's current position.
    ///
    /// # Errors
    /// `MissingReferenceData` if the frame has no local position.
    pub fn place_at_current_position(
        &mut self,
        mut node: PlacedNode,
        frame: &ReferenceFrame,
    ) -> PlacementResult<NodeHandle> {
        let position = frame
            .current_local_position
            .ok_or(PlacementError::MissingReferenceData("current local position"))?;
        node.anchor = None;
        let handle = self.place(node);
        if let Some(node) = self.get_mut(&handle) {
            node.pin_at(position);
        }
        Ok(handle)
    }

    /// Removes a node.
    pub fn remove(&mut self, handle: &NodeHandle) -> PlacementResult<PlacedNode> {
        let seq = self
            .sequence
            .remove(handle)
            .ok_or(PlacementError::NodeNotFound(*handle))?;
        self.index.remove(handle);
        let node = self.nodes.remove(&seq).ok_or(PlacementError::NodeNotFound(*handle))?;
        info!("Removed node {}", handle);
        Ok(node)
    }

    fn get_mut(&mut self, handle: &NodeHandle) -> Option<&mut PlacedNode> {
        let seq = self.sequence.get(handle)?;
        self.nodes.get_mut(seq)
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Resolves pending placements, then updates every placed node.
    pub fn update_all(&mut self, frame: &ReferenceFrame) -> TickReport {
        let mut report = TickReport::default();
        let config = &self.config;
        let callback = &mut self.on_node_updated;
        let can_anchor = frame.best_geo_estimate.is_some() && frame.current_local_position.is_some();

        for node in self.nodes.values_mut() {
            let notify = |n: &PlacedNode| {
                if let Some(cb) = callback.as_mut() {
                    cb(n)
                }
            };

            match (node.state, node.anchor.is_some()) {
                (PlacementState::Pending, false) => match frame.current_local_position {
                    Some(position) => {
                        node.pin_at(position);
                        report.placed += 1;
                        report.pinned += 1;
                    }
                    None => report.pending += 1,
                },
                (PlacementState::Pending, true) if !can_anchor => report.pending += 1,
                (PlacementState::Pending, true) => match node.update(frame, true, config, notify) {
                    UpdateOutcome::Updated => {
                        debug!("Node {} set up at {:?}", node.handle, node.transform.position);
                        report.placed += 1;
                        report.updated += 1;
                    }
                    _ => report.pending += 1,
                },
                (PlacementState::Placed, _) => match node.update(frame, false, config, notify) {
                    UpdateOutcome::Updated => report.updated += 1,
                    UpdateOutcome::Deferred => report.deferred += 1,
                    UpdateOutcome::Pinned => report.pinned += 1,
                    UpdateOutcome::Frozen => report.frozen += 1,
                },
            }
        }

        if report.deferred > 0 || report.pending > 0 {
            debug!(
                "Tick: {} updated, {} deferred, {} pending",
                report.updated, report.deferred, report.pending
            );
        }
        report
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Handles in drawing sequence: render order hint ascending, so far
    /// nodes come first and nearer nodes draw on top; ties by insertion.
    pub fn draw_order(&self) -> Vec<NodeHandle> {
        let mut order: Vec<(i64, u64, NodeHandle)> = self
            .nodes
            .iter()
            .map(|(seq, node)| (node.render_order_hint, *seq, node.handle))
            .collect();
        order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        order.into_iter().map(|(_, _, handle)| handle).collect()
    }

    /// Anchored nodes within `radius` metres of `coordinate`, nearest first.
    pub fn nodes_within(&self, coordinate: &GeoCoordinate, radius: f64) -> Vec<(NodeHandle, f64)> {
        self.index.within(coordinate, radius)
    }

    /// Reports a node as selected through the selection callback.
    pub fn select(&mut self, handle: &NodeHandle) -> PlacementResult<()> {
        let seq = self
            .sequence
            .get(handle)
            .ok_or(PlacementError::NodeNotFound(*handle))?;
        let tag = self.nodes.get(seq).and_then(|n| n.tag.as_deref());
        if let Some(cb) = self.on_node_selected.as_mut() {
            cb(*handle, tag);
        }
        Ok(())
    }

    /// Selects the nearest anchored node within `radius` of `coordinate`.
    pub fn pick_nearest(&mut self, coordinate: &GeoCoordinate, radius: f64) -> Option<NodeHandle> {
        let (handle, _) = self.nodes_within(coordinate, radius).into_iter().next()?;
        self.select(&handle).ok()?;
        Some(handle)
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("anchors", &self.index.len())
            .finish()
    }
}
