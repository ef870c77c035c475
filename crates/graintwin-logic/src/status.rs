//! Operator-facing alerts derived from the current readings.

use crate::environment::{EnvironmentState, PestPosition};

/// A probe reading above this is a hot spot (°C).
pub const HOT_SPOT_C: f64 = 30.0;
/// Humidity above this carries a mold risk (%).
pub const MOLD_RISK_HUMIDITY: f64 = 70.0;

/// Overall silo condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Hazard {
    /// No alerts.
    Safe,
    /// One kind of alert.
    Warning,
    /// Two or more kinds of alert at once.
    Danger,
}

/// Alert flags for one environment snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SiloStatus {
    pub hot_sensors: [bool; 3],
    pub mold_risk: bool,
    pub pest_alert: bool,
    pub hazard: Hazard,
}

impl SiloStatus {
    pub fn any_hot(&self) -> bool {
        self.hot_sensors.iter().any(|&h| h)
    }
}

/// Assess a snapshot against the alert thresholds.
pub fn assess(state: &EnvironmentState) -> SiloStatus {
    let hot_sensors = state.temperatures.map(|t| t > HOT_SPOT_C);
    let mold_risk = state.humidity > MOLD_RISK_HUMIDITY;
    let pest_alert = state.pest_count > 0;

    let alerts = [hot_sensors.iter().any(|&h| h), mold_risk, pest_alert]
        .iter()
        .filter(|&&a| a)
        .count();
    let hazard = match alerts {
        0 => Hazard::Safe,
        1 => Hazard::Warning,
        _ => Hazard::Danger,
    };

    SiloStatus {
        hot_sensors,
        mold_risk,
        pest_alert,
        hazard,
    }
}

/// Probe name by index.
pub fn sensor_name(index: usize) -> &'static str {
    match index {
        0 => "Bottom",
        1 => "Middle",
        _ => "Top",
    }
}

/// Overlay label for a probe, e.g. `Sensor 2: 25.0°C`.
pub fn sensor_label(index: usize, temperature: f64) -> String {
    format!("Sensor {}: {:.1}°C", index + 1, temperature)
}

/// Sector text for a detected pest, e.g. `(0.2, -0.4)`.
pub fn pest_sector_label(pos: &PestPosition) -> String {
    format!("({:.1}, {:.1})", pos.x, pos.y)
}
