//! JSON exporter for offline inspection of a walk.
//!
//! Each frame records where the viewer really was, where the engine thought
//! it was, and where every node ended up in the scene.

use crate::world::WorldEvent;
use geoscene_core::{PlacedNode, PlacementState};
use geoscene_env::GeoCoordinate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    pub viewer: ViewerFrame,

    /// Every registered node
    pub nodes: Vec<NodeFrame>,

    /// Events raised during this tick
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<WorldEvent>,
}

/// Viewer pose: tracked, true and estimated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<[f64; 3]>,
    pub true_location: GeoCoordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<GeoCoordinate>,
    pub heading_offset: f64,
}

/// Scene state of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFrame {
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Uniform node scale, or content scale for billboards
    pub scale: f64,
    pub render_order: i64,
    pub placed: bool,
}

impl NodeFrame {
    pub fn new(node: &PlacedNode) -> Self {
        let p = node.transform.position;
        let scale = if node.is_billboard() {
            node.content.scale
        } else {
            node.transform.scale.x
        };
        Self {
            handle: node.handle.to_string(),
            tag: node.tag.clone(),
            x: p.x,
            y: p.y,
            z: p.z,
            scale,
            render_order: node.render_order_hint,
            placed: node.state == PlacementState::Placed,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Mean horizontal location error over the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_location_error: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            mean_location_error: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, mean_location_error: Option<f64>) {
        self.passed = passed;
        self.mean_location_error = mean_location_error;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
