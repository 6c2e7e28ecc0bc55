//! Geoscene Deterministic Simulation Harness
//!
//! Walks a simulated viewer through geo-anchored content and checks that the
//! placement engine keeps every node where its anchor says it should be.
//!
//! # Core Principle: Seeded Sensors
//!
//! The world owns the ground truth and derives everything the engine sees
//! from a single 64-bit seed:
//! - **Tracking**: scene-local pose with drift, relocalization jumps and
//!   dropouts, in a frame that may be misaligned with north
//! - **Location**: noisy GPS fixes fused by the [`SceneLocationManager`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      SimWorld                        │
//! │   ground truth ──► tracking pose ──┐                 │
//! │        │                           ▼                 │
//! │        └──► GPS fix ──► SceneLocationManager         │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ ReferenceFrame (per tick)
//!                   ┌────────▼────────┐
//!                   │  NodeRegistry   │──► transforms, draw order
//!                   └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use geoscene_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_duration(10.0).run(ScenarioId::Stroll);
//! assert!(result.passed);
//! ```

pub mod demo;
pub mod estimator;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod world;

pub use demo::{build_demo_data, build_walkway_markers};
pub use estimator::{EstimatorConfig, LocationEstimateMethod, SceneLocationEstimate, SceneLocationManager};
pub use exporter::{NodeFrame, SimExport, SimFrame, ViewerFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use world::{SimConfig, SimWorld, WorldEvent};
