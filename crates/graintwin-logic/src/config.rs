//! Twin configuration: silo geometry, scenario tuning, driver settings.
//!
//! Every field has a default matching the reference silo, so a config file
//! only needs to name what it changes:
//!
//! ```
//! use graintwin_logic::config::{validate_config, TwinConfig};
//!
//! let mut config = TwinConfig::default();
//! config.silo.particle_count = 4_000;
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Physical layout of the silo and the grain volume inside it.
///
/// All lengths are in scene units with the silo floor at `y = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiloGeometry {
    /// Number of grain particles generated at startup.
    pub particle_count: usize,
    /// Radius of the grain cylinder.
    pub radius: f32,
    /// Height of the grain cylinder.
    pub height: f32,
    /// Heights of the bottom, middle and top temperature probes.
    pub sensor_heights: [f32; 3],
    /// Center of the simulated moisture leak.
    pub leak_center: Vec3,
    /// Radius beyond which the leak has no effect.
    pub leak_radius: f32,
    pub shell_radius: f32,
    pub shell_height: f32,
    /// Scale from normalized pest coordinates to scene units.
    pub pest_marker_scale: f32,
    /// Height at which the pest marker floats (just above the grain).
    pub pest_marker_height: f32,
}

impl Default for SiloGeometry {
    fn default() -> Self {
        Self {
            particle_count: 12_000,
            radius: 1.9,
            height: 4.0,
            sensor_heights: [0.5, 2.0, 3.5],
            leak_center: Vec3::new(1.2, 1.0, 0.0),
            leak_radius: 1.8,
            shell_radius: 2.1,
            shell_height: 5.0,
            pest_marker_scale: 1.8,
            pest_marker_height: 4.05,
        }
    }
}

impl SiloGeometry {
    /// Scene position of the pest marker for a normalized pest position.
    pub fn pest_marker_position(&self, pest: &crate::environment::PestPosition) -> Vec3 {
        Vec3::new(
            pest.x as f32 * self.pest_marker_scale,
            self.pest_marker_height,
            pest.y as f32 * self.pest_marker_scale,
        )
    }
}

/// Per-tick step sizes and limits used by the scenario stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioTuning {
    /// Temperature noise is uniform in [-amp, amp).
    pub temperature_jitter: f64,
    /// Humidity noise is uniform in [-amp, amp).
    pub humidity_jitter: f64,
    pub baseline_temperature: f64,
    pub baseline_humidity: f64,
    /// Normal mode temperature relaxation per tick.
    pub temperature_relax_step: f64,
    /// Normal mode humidity relaxation per tick when above baseline.
    pub humidity_relax_down: f64,
    /// Normal mode humidity relaxation per tick when below baseline.
    pub humidity_relax_up: f64,
    pub heat_spike_step: f64,
    pub heat_spike_max: f64,
    pub humidity_rise_step: f64,
    pub humidity_max: f64,
    /// Where a new pest appears.
    pub pest_spawn: (f64, f64),
    /// Pest wander is uniform in [-amp, amp) per axis.
    pub pest_jitter: f64,
    /// Pest coordinates are clamped to [-bound, bound].
    pub pest_bound: f64,
}

impl Default for ScenarioTuning {
    fn default() -> Self {
        Self {
            temperature_jitter: 0.05,
            humidity_jitter: 0.1,
            baseline_temperature: 25.0,
            baseline_humidity: 45.0,
            temperature_relax_step: 0.1,
            humidity_relax_down: 0.5,
            humidity_relax_up: 0.1,
            heat_spike_step: 0.3,
            heat_spike_max: 45.0,
            humidity_rise_step: 1.5,
            humidity_max: 95.0,
            pest_spawn: (0.2, 0.2),
            pest_jitter: 0.05,
            pest_bound: 0.8,
        }
    }
}

/// Settings for the external report service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Base URL of the generative-text REST API.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key, read on every request.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Complete twin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwinConfig {
    pub silo: SiloGeometry,
    pub scenario: ScenarioTuning,
    pub report: ReportConfig,
    /// Seconds between ticks.
    pub tick_seconds: f32,
    /// Maximum number of history points kept.
    pub history_capacity: usize,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            silo: SiloGeometry::default(),
            scenario: ScenarioTuning::default(),
            report: ReportConfig::default(),
            tick_seconds: 1.0,
            history_capacity: 30,
            seed: None,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No particles to render.
    EmptyParticleField,
    /// Radius or height not strictly positive.
    DegenerateCylinder { radius: f32, height: f32 },
    /// Probe heights must be strictly increasing.
    UnorderedSensors([f32; 3]),
    /// Leak radius not strictly positive.
    InvalidLeakRadius(f32),
    /// Tick period not strictly positive.
    InvalidTickPeriod(f32),
    /// History must hold at least one point.
    EmptyHistory,
    /// Pest bound outside (0, 1].
    InvalidPestBound(f64),
    /// A scenario cap is below its baseline.
    CapBelowBaseline { cap: f64, baseline: f64 },
    /// A step or jitter amplitude is negative.
    NegativeStep(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyParticleField => write!(f, "particle_count must be positive"),
            ConfigError::DegenerateCylinder { radius, height } => {
                write!(f, "silo cylinder {}x{} is degenerate", radius, height)
            }
            ConfigError::UnorderedSensors(h) => {
                write!(f, "sensor heights {:?} are not strictly increasing", h)
            }
            ConfigError::InvalidLeakRadius(r) => write!(f, "leak radius {} must be positive", r),
            ConfigError::InvalidTickPeriod(t) => write!(f, "tick period {} must be positive", t),
            ConfigError::EmptyHistory => write!(f, "history_capacity must be positive"),
            ConfigError::InvalidPestBound(b) => write!(f, "pest bound {} outside (0, 1]", b),
            ConfigError::CapBelowBaseline { cap, baseline } => {
                write!(f, "cap {} is below baseline {}", cap, baseline)
            }
            ConfigError::NegativeStep(s) => write!(f, "step {} must not be negative", s),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &TwinConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let silo = &config.silo;
    let tuning = &config.scenario;

    if silo.particle_count == 0 {
        errors.push(ConfigError::EmptyParticleField);
    }
    if !(silo.radius > 0.0 && silo.height > 0.0) {
        errors.push(ConfigError::DegenerateCylinder {
            radius: silo.radius,
            height: silo.height,
        });
    }
    let [h0, h1, h2] = silo.sensor_heights;
    if !(h0 < h1 && h1 < h2) {
        errors.push(ConfigError::UnorderedSensors(silo.sensor_heights));
    }
    if !(silo.leak_radius > 0.0) {
        errors.push(ConfigError::InvalidLeakRadius(silo.leak_radius));
    }
    if !(config.tick_seconds > 0.0) {
        errors.push(ConfigError::InvalidTickPeriod(config.tick_seconds));
    }
    if config.history_capacity == 0 {
        errors.push(ConfigError::EmptyHistory);
    }
    if !(tuning.pest_bound > 0.0 && tuning.pest_bound <= 1.0) {
        errors.push(ConfigError::InvalidPestBound(tuning.pest_bound));
    }
    if tuning.heat_spike_max < tuning.baseline_temperature {
        errors.push(ConfigError::CapBelowBaseline {
            cap: tuning.heat_spike_max,
            baseline: tuning.baseline_temperature,
        });
    }
    if tuning.humidity_max < tuning.baseline_humidity {
        errors.push(ConfigError::CapBelowBaseline {
            cap: tuning.humidity_max,
            baseline: tuning.baseline_humidity,
        });
    }
    for step in [
        tuning.temperature_jitter,
        tuning.humidity_jitter,
        tuning.temperature_relax_step,
        tuning.humidity_relax_down,
        tuning.humidity_relax_up,
        tuning.heat_spike_step,
        tuning.humidity_rise_step,
        tuning.pest_jitter,
    ] {
        if step < 0.0 {
            errors.push(ConfigError::NegativeStep(step));
        }
    }

    errors
}
