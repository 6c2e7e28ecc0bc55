//! Simulation scenarios.

use crate::world::SimConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// GEO-001: Walk past nearby markers with noisy GPS
    Stroll,

    /// GEO-002: No GPS for the first seconds; placement must wait
    ColdStart,

    /// GEO-003: Tracking drops out mid-walk
    TrackingLoss,

    /// GEO-004: Periodic relocalization jumps of the tracking frame
    Relocalization,

    /// GEO-005: Tracking frame misaligned with north, nudged into place
    HeadingAlignment,

    /// GEO-006: Far landmarks: draw order and far-field attenuation
    Landmarks,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Stroll,
            ScenarioId::ColdStart,
            ScenarioId::TrackingLoss,
            ScenarioId::Relocalization,
            ScenarioId::HeadingAlignment,
            ScenarioId::Landmarks,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Stroll => "stroll",
            ScenarioId::ColdStart => "cold_start",
            ScenarioId::TrackingLoss => "tracking_loss",
            ScenarioId::Relocalization => "relocalization",
            ScenarioId::HeadingAlignment => "heading_alignment",
            ScenarioId::Landmarks => "landmarks",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Stroll => "Walk past markers with 3 m GPS noise, check projection every tick",
            ScenarioId::ColdStart => "First GPS fix after 3 s, nodes stay pending until then",
            ScenarioId::TrackingLoss => "Tracking lost for 2 s, updates deferred and transforms held",
            ScenarioId::Relocalization => "2 m tracking jumps every 4 s, placement follows the frame",
            ScenarioId::HeadingAlignment => "Tracking frame 12° off north, heading offset nudged 1°/s",
            ScenarioId::Landmarks => "Landmarks up to 8600 km away, draw order and scale attenuation",
        }
    }

    /// Applies the scenario's conditions to a base configuration.
    pub fn configure(&self, base: SimConfig) -> SimConfig {
        match self {
            ScenarioId::Stroll | ScenarioId::Landmarks => base,
            ScenarioId::ColdStart => SimConfig {
                gps_start_delay_secs: 3.0,
                ..base
            },
            ScenarioId::TrackingLoss => SimConfig {
                tracking_loss: Some((5.0, 7.0)),
                ..base
            },
            ScenarioId::Relocalization => SimConfig {
                relocalization_interval_secs: 4.0,
                relocalization_jump: 2.0,
                ..base
            },
            ScenarioId::HeadingAlignment => SimConfig {
                tracking_heading_offset: 12.0,
                ..base
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stroll" | "geo-001" => Ok(ScenarioId::Stroll),
            "cold_start" | "coldstart" | "geo-002" => Ok(ScenarioId::ColdStart),
            "tracking_loss" | "trackingloss" | "geo-003" => Ok(ScenarioId::TrackingLoss),
            "relocalization" | "geo-004" => Ok(ScenarioId::Relocalization),
            "heading_alignment" | "headingalignment" | "geo-005" => Ok(ScenarioId::HeadingAlignment),
            "landmarks" | "geo-006" => Ok(ScenarioId::Landmarks),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_configure_only_touches_its_knob() {
        let base = SimConfig::default();
        let cold = ScenarioId::ColdStart.configure(base.clone());
        assert_eq!(cold.gps_start_delay_secs, 3.0);
        assert_eq!(cold.seed, base.seed);
        assert_eq!(ScenarioId::Stroll.configure(base.clone()), base);
    }
}
