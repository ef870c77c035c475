//! Silo sensor readings and scenario modes.
//!
//! [`EnvironmentState`] is the single source of truth for what the silo
//! sensors currently report: three DS18B20-style temperature probes stacked
//! along the silo axis, one humidity sensor, and a vision-based pest counter
//! that reports at most one pest and its normalized floor position.
//!
//! The state is advanced once per tick by the scenario stepper in
//! `graintwin-core`; the [`ScenarioMode`] it applies is an operator input
//! and is not part of the state itself.

use serde::{Deserialize, Serialize};

/// Index of the bottom temperature probe.
pub const SENSOR_BOTTOM: usize = 0;
/// Index of the middle temperature probe.
pub const SENSOR_MIDDLE: usize = 1;
/// Index of the top temperature probe.
pub const SENSOR_TOP: usize = 2;

/// Normalized pest position on the grain surface, both axes in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PestPosition {
    pub x: f64,
    pub y: f64,
}

impl PestPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates lie inside [-1, 1].
    pub fn in_bounds(&self) -> bool {
        (-1.0..=1.0).contains(&self.x) && (-1.0..=1.0).contains(&self.y)
    }
}

/// Current silo readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    /// Bottom, middle, top probe temperatures in °C.
    pub temperatures: [f64; 3],
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Number of pests seen by the vision sensor.
    pub pest_count: u32,
    /// Present if and only if `pest_count > 0`.
    pub pest_position: Option<PestPosition>,
    /// Milliseconds since the Unix epoch of the last update.
    pub last_updated: u64,
}

impl EnvironmentState {
    /// Readings the twin boots with.
    pub fn initial(timestamp: u64) -> Self {
        Self {
            temperatures: [24.5, 25.0, 24.8],
            humidity: 45.0,
            pest_count: 0,
            pest_position: None,
            last_updated: timestamp,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.temperatures[SENSOR_BOTTOM]
    }

    pub fn middle(&self) -> f64 {
        self.temperatures[SENSOR_MIDDLE]
    }

    pub fn top(&self) -> f64 {
        self.temperatures[SENSOR_TOP]
    }

    pub fn has_pest(&self) -> bool {
        self.pest_count > 0
    }

    /// Check the pest invariant and that every reading is finite.
    pub fn is_consistent(&self) -> bool {
        let pest_ok = match self.pest_position {
            Some(pos) => self.pest_count > 0 && pos.in_bounds(),
            None => self.pest_count == 0,
        };
        pest_ok
            && self.humidity.is_finite()
            && self.temperatures.iter().all(|t| t.is_finite())
    }
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self::initial(0)
    }
}

/// Operator-selected perturbation rule applied by the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScenarioMode {
    /// Readings relax toward baseline, pests are cleared.
    #[default]
    Normal,
    /// The middle probe heats up.
    HeatSpike,
    /// Humidity climbs.
    HighHumidity,
    /// A pest appears and wanders.
    PestInvasion,
}

impl ScenarioMode {
    pub const ALL: [ScenarioMode; 4] = [
        ScenarioMode::Normal,
        ScenarioMode::HeatSpike,
        ScenarioMode::HighHumidity,
        ScenarioMode::PestInvasion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioMode::Normal => "Normal",
            ScenarioMode::HeatSpike => "Heat spike",
            ScenarioMode::HighHumidity => "High humidity",
            ScenarioMode::PestInvasion => "Pest invasion",
        }
    }
}

impl std::fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_consistent() {
        let state = EnvironmentState::initial(1_000);
        assert!(state.is_consistent());
        assert_eq!(state.temperatures, [24.5, 25.0, 24.8]);
        assert_eq!(state.humidity, 45.0);
        assert_eq!(state.last_updated, 1_000);
    }

    #[test]
    fn test_pest_without_position_is_inconsistent() {
        let state = EnvironmentState {
            pest_count: 1,
            ..Default::default()
        };
        assert!(!state.is_consistent());
    }

    #[test]
    fn test_position_without_pest_is_inconsistent() {
        let state = EnvironmentState {
            pest_position: Some(PestPosition::new(0.0, 0.0)),
            ..Default::default()
        };
        assert!(!state.is_consistent());
    }

    #[test]
    fn test_out_of_bounds_pest_is_inconsistent() {
        let state = EnvironmentState {
            pest_count: 1,
            pest_position: Some(PestPosition::new(1.2, 0.0)),
            ..Default::default()
        };
        assert!(!state.is_consistent());
    }

    #[test]
    fn test_default_mode_is_normal() {
        assert_eq!(ScenarioMode::default(), ScenarioMode::Normal);
        assert_eq!(ScenarioMode::ALL.len(), 4);
    }

    #[test]
    fn test_json_roundtrip_within_tolerance() {
        let state = EnvironmentState {
            temperatures: [24.512345678901234, 31.000000000000004, 24.8],
            humidity: 72.33333333333333,
            pest_count: 1,
            pest_position: Some(PestPosition::new(-0.123456789, 0.7999999999)),
            last_updated: 1_700_000_000_123,
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: EnvironmentState = serde_json::from_str(&json).unwrap();

        for (a, b) in state.temperatures.iter().zip(back.temperatures.iter()) {
            assert!((a - b).abs() <= 1e-9);
        }
        assert!((state.humidity - back.humidity).abs() <= 1e-9);
        assert_eq!(back.pest_count, 1);
        assert_eq!(back.last_updated, state.last_updated);
        let (p, q) = (state.pest_position.unwrap(), back.pest_position.unwrap());
        assert!((p.x - q.x).abs() <= 1e-9 && (p.y - q.y).abs() <= 1e-9);
        assert!(back.is_consistent());
    }
}
