//! Scenario runner - walks a simulated viewer through placed content.
//!
//! Every scenario shares the same loop: step the world, capture a reference
//! frame, run one engine tick, then check the placement invariants against
//! the frame the engine saw. Scenario-specific checks run at the end.

use crate::demo::{build_demo_data, build_walkway_markers};
use crate::exporter::{NodeFrame, SimExport, SimFrame, ViewerFrame};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld, WorldEvent};

use geoscene_core::{
    GeoProjector, GeometryKind, NodeRegistry, PlacedNode, PlacementResult, PlacementState, TickReport,
};
use geoscene_env::{LocalPosition, NodeHandle, ReferenceFrame};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of walkway markers laid along the walk.
const WALKWAY_MARKERS: usize = 6;

/// Spacing between walkway markers (m).
const WALKWAY_SPACING: f64 = 5.0;

/// Tolerance for projected positions (m).
const PROJECTION_TOLERANCE: f64 = 1e-6;

/// Export one frame every this many ticks.
const EXPORT_EVERY: u64 = 3;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Nodes registered at the end
    pub final_node_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Recorded frames, when export was requested
    pub export: Option<SimExport>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// Committed node updates
    pub updates: u64,

    /// Updates deferred for missing reference data
    pub deferred: u64,

    /// Ticks on which at least one node was still pending
    pub pending_ticks: u64,

    /// Completion callbacks observed
    pub commits: u64,

    pub gps_fixes: u64,
    pub relocalizations: u64,

    /// Time of the first GPS fix (s)
    pub first_fix_secs: Option<f64>,

    /// Time the first anchored node was placed (s)
    pub first_placement_secs: Option<f64>,

    /// Mean horizontal error of the location estimate (m)
    pub mean_location_error: f64,

    /// Worst horizontal error of the location estimate (m)
    pub max_location_error: f64,

    /// Horizontal error of the location estimate on the last tick (m)
    pub final_location_error: Option<f64>,

    /// Worst deviation of a node from its projected anchor (m)
    pub max_projection_error: f64,

    /// Nodes reported through the selection callback
    pub selections: u64,
}

/// State of a finished walk, handed to the scenario checks.
struct Walk {
    world: SimWorld,
    registry: NodeRegistry,
    metrics: ScenarioMetrics,
    ticks: u64,
    violation: Option<String>,
    start_marker: Option<NodeHandle>,
    export: Option<SimExport>,
}

/// Runs placement scenarios.
pub struct ScenarioRunner {
    /// Base configuration; each scenario layers its conditions on top
    base: SimConfig,

    /// Record frames for export
    export: bool,
}

impl ScenarioRunner {
    /// Creates a runner with default conditions and the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            base: SimConfig { seed, ..SimConfig::default() },
            export: false,
        }
    }

    /// Uses `config` as the base configuration (its seed included).
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.base = config;
        self
    }

    /// Sets the simulated duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.base.duration_secs = secs;
        self
    }

    /// Records frames for JSON export.
    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    pub fn seed(&self) -> u64 {
        self.base.seed
    }

    /// Runs a scenario.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.base.seed);
        let config = scenario.configure(self.base.clone());

        let mut walk = match self.walk(scenario, config.clone()) {
            Ok(walk) => walk,
            Err(e) => {
                warn!("Scenario {} could not start: {}", scenario.name(), e);
                return ScenarioResult {
                    scenario,
                    seed: config.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    final_node_count: 0,
                    failure_reason: Some(e.to_string()),
                    metrics: ScenarioMetrics::default(),
                    export: None,
                };
            }
        };

        let failure = walk.violation.take().or_else(|| match scenario {
            ScenarioId::Stroll => Self::check_stroll(&mut walk),
            ScenarioId::ColdStart => Self::check_cold_start(&walk),
            ScenarioId::TrackingLoss => Self::check_tracking_loss(&walk),
            ScenarioId::Relocalization => Self::check_relocalization(&walk),
            ScenarioId::HeadingAlignment => Self::check_heading_alignment(&walk),
            ScenarioId::Landmarks => Self::check_landmarks(&walk),
        });
        let passed = failure.is_none();

        match &failure {
            None => info!(
                "✓ {} complete: {} updates, mean location error {:.2}m",
                scenario.name(),
                walk.metrics.updates,
                walk.metrics.mean_location_error
            ),
            Some(reason) => warn!("✗ {} failed: {}", scenario.name(), reason),
        }

        let mut export = walk.export;
        if let Some(export) = export.as_mut() {
            export.finalize(passed, Some(walk.metrics.mean_location_error));
        }

        ScenarioResult {
            scenario,
            seed: config.seed,
            passed,
            total_ticks: walk.ticks,
            final_time_secs: walk.world.time(),
            final_node_count: walk.registry.len(),
            failure_reason: failure,
            metrics: walk.metrics,
            export,
        }
    }

    // ========================================================================
    // SHARED LOOP
    // ========================================================================

    fn walk(&self, scenario: ScenarioId, config: SimConfig) -> PlacementResult<Walk> {
        let mut world = SimWorld::new(config.clone())?;
        let mut registry = NodeRegistry::new(config.engine.clone());

        let commits = Arc::new(AtomicU64::new(0));
        let selections = Arc::new(AtomicU64::new(0));
        {
            let commits = Arc::clone(&commits);
            registry.on_node_updated(move |_| {
                commits.fetch_add(1, Ordering::Relaxed);
            });
            let selections = Arc::clone(&selections);
            registry.on_node_selected(move |handle, tag| {
                debug!("Selected {} ({})", handle, tag.unwrap_or("untagged"));
                selections.fetch_add(1, Ordering::Relaxed);
            });
        }

        let origin = *world.origin();
        for node in build_demo_data(&origin, &config.engine.blob)? {
            registry.place(node);
        }
        for node in build_walkway_markers(&origin, config.walk_bearing, WALKWAY_MARKERS, WALKWAY_SPACING)? {
            registry.place(node);
        }

        let mut metrics = ScenarioMetrics::default();
        let mut export = self.export.then(|| SimExport::new(scenario.name(), config.seed));
        let mut violation = None;
        let mut start_marker = None;
        let mut error_sum = 0.0;
        let mut error_samples = 0u64;
        let total_ticks = config.total_ticks();
        let mut ticks = 0;

        while ticks < total_ticks {
            let events = world.step()?;
            ticks += 1;

            for event in &events {
                match event {
                    WorldEvent::GpsFix { .. } => {
                        metrics.gps_fixes += 1;
                        if metrics.first_fix_secs.is_none() {
                            metrics.first_fix_secs = Some(world.time());
                        }
                    }
                    WorldEvent::Relocalized { .. } => metrics.relocalizations += 1,
                    WorldEvent::TrackingLost => info!("  ⚡ Tracking lost at t={:.2}s", world.time()),
                    WorldEvent::TrackingRestored => info!("  ✓ Tracking restored at t={:.2}s", world.time()),
                }
            }

            if scenario == ScenarioId::HeadingAlignment {
                Self::nudge_heading(&mut world, ticks);
            }

            let frame = world.frame();
            if start_marker.is_none() && frame.current_local_position.is_some() {
                let marker = PlacedNode::volumetric(
                    None,
                    GeometryKind::Box { width: 0.5, height: 0.5, length: 0.5 },
                )?
                .with_tag("Start");
                start_marker = Some(registry.place_at_current_position(marker, &frame)?);
            }

            let before: Vec<_> = registry.iter().map(|n| n.transform.position).collect();
            let report = registry.update_all(&frame);

            metrics.updates += report.updated as u64;
            metrics.deferred += report.deferred as u64;
            if report.pending > 0 {
                metrics.pending_ticks += 1;
            }
            if metrics.first_placement_secs.is_none() && Self::any_anchored_placed(&registry) {
                metrics.first_placement_secs = Some(world.time());
            }

            if violation.is_none() {
                violation = Self::check_tick(&registry, &frame, &report, &before, &mut metrics)
                    .map(|reason| format!("t={:.2}s: {}", world.time(), reason));
            }

            if let Some(error) = world.location_error() {
                error_sum += error;
                error_samples += 1;
                metrics.max_location_error = metrics.max_location_error.max(error);
                metrics.final_location_error = Some(error);
            }

            if let Some(export) = export.as_mut() {
                if ticks % EXPORT_EVERY == 0 || !events.is_empty() {
                    export.add_frame(Self::capture(&world, &registry, &frame, events));
                }
            }
        }

        if error_samples > 0 {
            metrics.mean_location_error = error_sum / error_samples as f64;
        }
        metrics.commits = commits.load(Ordering::Relaxed);
        metrics.selections = selections.load(Ordering::Relaxed);

        Ok(Walk {
            world,
            registry,
            metrics,
            ticks,
            violation,
            start_marker,
            export,
        })
    }

    fn any_anchored_placed(registry: &NodeRegistry) -> bool {
        registry
            .iter()
            .any(|n| n.is_anchored() && n.state == PlacementState::Placed)
    }

    /// Per-tick invariants.
    fn check_tick(
        registry: &NodeRegistry,
        frame: &ReferenceFrame,
        report: &TickReport,
        before: &[LocalPosition],
        metrics: &mut ScenarioMetrics,
    ) -> Option<String> {
        let far_field = registry.config().far_field_distance;
        let complete = frame.is_complete();

        if !complete {
            if report.updated > 0 {
                return Some(format!("{} updates without reference data", report.updated));
            }
            // Nothing moves while the frame is incomplete
            let moved = registry
                .iter()
                .zip(before)
                .filter(|(n, p)| n.transform.position != **p)
                .count();
            if moved > 0 {
                return Some(format!("{} nodes moved without reference data", moved));
            }
        }

        for node in registry.iter().filter(|n| n.state == PlacementState::Placed) {
            let scale = if node.is_billboard() {
                node.content.scale
            } else {
                node.transform.scale.x
            };
            if !(scale > 0.0 && scale.is_finite()) {
                return Some(format!("{:?} has scale {}", node.tag, scale));
            }

            if node.adjusted_distance().is_some_and(|d| d > far_field + 1e-9) {
                return Some(format!("{:?} adjusted distance beyond far field", node.tag));
            }

            let (Some(anchor), true) = (node.anchor, complete) else {
                continue;
            };
            let anchor = match (node.options.ignore_altitude, frame.current_geo_location) {
                (true, Some(reference)) => anchor.at_altitude(reference.altitude()),
                _ => anchor,
            };
            let Ok(expected) = GeoProjector::project(&anchor, frame) else {
                continue;
            };
            let error = (node.transform.position - expected).norm();
            metrics.max_projection_error = metrics.max_projection_error.max(error);
            if error > PROJECTION_TOLERANCE {
                return Some(format!("{:?} is {:.3}m off its projected anchor", node.tag, error));
            }
        }

        let hints: Vec<i64> = registry
            .draw_order()
            .iter()
            .filter_map(|h| registry.get(h))
            .map(|n| n.render_order_hint)
            .collect();
        // Far to near: hints never decrease along the drawing sequence
        if hints.windows(2).any(|w| w[0] > w[1]) {
            return Some("draw order not sorted by render hint".to_string());
        }

        None
    }

    /// Turns the scene heading one step per second toward the true
    /// misalignment, like a user lining content up by eye.
    fn nudge_heading(world: &mut SimWorld, tick: u64) {
        let rate = u64::from(world.config().tick_rate_hz.max(1));
        if tick % rate != 0 {
            return;
        }
        let target = world.config().tracking_heading_offset;
        let step = world.estimator().config().heading_step;
        let current = world.estimator().heading_offset();
        let diff = (target - current + 540.0).rem_euclid(360.0) - 180.0;
        if diff >= step / 2.0 {
            world.estimator_mut().move_heading_clockwise();
        } else if diff <= -step / 2.0 {
            world.estimator_mut().move_heading_anticlockwise();
        }
    }

    fn capture(
        world: &SimWorld,
        registry: &NodeRegistry,
        frame: &ReferenceFrame,
        events: Vec<WorldEvent>,
    ) -> SimFrame {
        SimFrame {
            time_sec: world.time(),
            viewer: ViewerFrame {
                tracked: frame.current_local_position.map(|p| [p.x, p.y, p.z]),
                true_location: *world.true_location(),
                estimate: frame.current_geo_location,
                heading_offset: frame.scene_heading_offset,
            },
            nodes: registry.iter().map(NodeFrame::new).collect(),
            events,
        }
    }

    // ========================================================================
    // SCENARIO CHECKS
    // ========================================================================

    /// Allowed mean location error for the configured noise and jumps.
    fn error_budget(config: &SimConfig) -> f64 {
        let jumps = if config.relocalization_interval_secs > 0.0 {
            (config.estimator.max_estimate_age / config.relocalization_interval_secs).ceil()
        } else {
            0.0
        };
        4.0 * config.gps_noise_std + jumps * config.relocalization_jump + 1.0
    }

    fn check_location_error(walk: &Walk) -> Option<String> {
        let budget = Self::error_budget(walk.world.config());
        (walk.metrics.mean_location_error > budget).then(|| {
            format!(
                "mean location error {:.2}m over budget {:.2}m",
                walk.metrics.mean_location_error, budget
            )
        })
    }

    fn check_start_marker(walk: &Walk) -> Option<String> {
        let Some(handle) = walk.start_marker else {
            return Some("start marker never placed".to_string());
        };
        match walk.registry.get(&handle) {
            Some(node) if node.state == PlacementState::Placed && !node.is_anchored() => None,
            _ => Some("start marker not pinned".to_string()),
        }
    }

    fn check_stroll(walk: &mut Walk) -> Option<String> {
        if let Some(reason) = Self::check_location_error(walk).or_else(|| Self::check_start_marker(walk)) {
            return Some(reason);
        }

        // The walk passes within a few metres of the markers
        let here = *walk.world.true_location();
        let nearby = walk.registry.nodes_within(&here, 15.0);
        if nearby.is_empty() {
            return Some("no marker within 15m of the viewer".to_string());
        }
        if walk.registry.pick_nearest(&here, 15.0).is_none() {
            return Some("nearest marker could not be selected".to_string());
        }
        walk.metrics.selections += 1;

        let pending = walk
            .registry
            .iter()
            .filter(|n| n.state == PlacementState::Pending)
            .count();
        (pending > 0).then(|| format!("{} nodes never placed", pending))
    }

    fn check_cold_start(walk: &Walk) -> Option<String> {
        let m = &walk.metrics;
        let (Some(fix), Some(placed)) = (m.first_fix_secs, m.first_placement_secs) else {
            return Some("no anchored node placed".to_string());
        };
        if placed < fix {
            return Some(format!("anchored node placed at {:.2}s before the first fix at {:.2}s", placed, fix));
        }
        if m.pending_ticks == 0 {
            return Some("nothing waited for the first fix".to_string());
        }
        Self::check_start_marker(walk).or_else(|| Self::check_location_error(walk))
    }

    fn check_tracking_loss(walk: &Walk) -> Option<String> {
        if walk.metrics.deferred == 0 {
            return Some("no updates deferred during tracking loss".to_string());
        }
        Self::check_location_error(walk)
    }

    fn check_relocalization(walk: &Walk) -> Option<String> {
        let expected = (walk.world.config().duration_secs / walk.world.config().relocalization_interval_secs)
            .floor() as u64;
        if walk.metrics.relocalizations + 1 < expected {
            return Some(format!(
                "{} relocalizations, expected {}",
                walk.metrics.relocalizations, expected
            ));
        }
        Self::check_location_error(walk)
    }

    fn check_heading_alignment(walk: &Walk) -> Option<String> {
        let config = walk.world.config();
        let offset = walk.world.estimator().heading_offset();
        let diff = ((config.tracking_heading_offset - offset + 540.0).rem_euclid(360.0) - 180.0).abs();
        if diff > config.estimator.heading_step {
            return Some(format!(
                "heading offset {:.1}° still {:.1}° from alignment",
                offset, diff
            ));
        }
        match walk.metrics.final_location_error {
            Some(error) if error <= 4.0 * config.gps_noise_std + 1.0 => None,
            Some(error) => Some(format!("final location error {:.2}m after alignment", error)),
            None => Some("no location estimate".to_string()),
        }
    }

    fn check_landmarks(walk: &Walk) -> Option<String> {
        let by_tag = |tag: &str| walk.registry.iter().find(|n| n.tag.as_deref() == Some(tag));
        let (Some(near), Some(far), Some(farthest)) =
            (by_tag("Apple Park"), by_tag("Space Needle"), by_tag("Canary Wharf"))
        else {
            return Some("landmarks missing".to_string());
        };

        // Same clamped adjusted distance, so only far-field attenuation differs
        if near.content.scale <= far.content.scale {
            return Some(format!(
                "Apple Park scale {:.2} not above Space Needle scale {:.2}",
                near.content.scale, far.content.scale
            ));
        }

        let order = walk.registry.draw_order();
        let position = |handle: &NodeHandle| order.iter().position(|h| h == handle);
        match (position(&farthest.handle), position(&near.handle)) {
            (Some(f), Some(n)) if f < n => {}
            _ => return Some("Canary Wharf does not draw before Apple Park".to_string()),
        }

        let far_field = walk.registry.config().far_field_distance;
        let clamped = [near, far, farthest]
            .iter()
            .all(|n| n.adjusted_distance().is_some_and(|d| (d - far_field).abs() < 1e-9));
        if !clamped {
            return Some("landmark adjusted distance not clamped to the far field".to_string());
        }
        Self::check_location_error(walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroll_passes() {
        let result = ScenarioRunner::new(42).with_duration(10.0).run(ScenarioId::Stroll);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 300);
        assert!(result.metrics.commits >= result.metrics.updates);
        assert_eq!(result.metrics.selections, 1);
    }

    #[test]
    fn test_export_recorded_on_request() {
        let result = ScenarioRunner::new(1)
            .with_duration(2.0)
            .with_export(true)
            .run(ScenarioId::Stroll);
        let export = result.export.unwrap();
        assert_eq!(export.scenario, "stroll");
        assert!(export.frames.len() >= 20);
        assert_eq!(export.frames[0].nodes.len(), result.final_node_count);

        assert!(ScenarioRunner::new(1).with_duration(1.0).run(ScenarioId::Stroll).export.is_none());
    }

    #[test]
    fn test_error_budget_counts_jumps() {
        let config = ScenarioId::Relocalization.configure(SimConfig::default());
        // 15 s estimate age over 4 s jumps: four 2 m jumps on top of 4σ + 1
        assert_eq!(ScenarioRunner::error_budget(&config), 4.0 * 3.0 + 4.0 * 2.0 + 1.0);
        assert_eq!(ScenarioRunner::error_budget(&SimConfig::default()), 13.0);
    }
}
