//! Scalar fields over the grain volume and the field-to-color mapping.
//!
//! Two fields are derived from the current [`EnvironmentState`]:
//!
//! - **Temperature**: piecewise-linear in height through the three probes,
//!   one segment bottom→middle and one middle→top. Below the bottom probe
//!   and above the top probe the nearest probe value holds.
//! - **Leak wetness**: a cone around a fixed leak point. Strength scales
//!   with how far ambient humidity is above [`field_constants::HUMID_THRESHOLD`]
//!   and falls linearly to zero at the leak radius.
//!
//! A [`FieldSnapshot`] captures both fields for one frame so the per-particle
//! work is a handful of multiplies:
//!
//! ```
//! use graintwin_logic::config::SiloGeometry;
//! use graintwin_logic::environment::EnvironmentState;
//! use graintwin_logic::field::FieldSnapshot;
//! use graintwin_logic::geometry::Vec3;
//!
//! let fields = FieldSnapshot::new(&EnvironmentState::default(), &SiloGeometry::default());
//! let color = fields.color_at(Vec3::new(0.0, 2.0, 0.0));
//! assert_eq!(color, graintwin_logic::color::palette::GRAIN_GOLD);
//! ```

use crate::color::{palette, Rgb};
use crate::config::SiloGeometry;
use crate::environment::EnvironmentState;
use crate::geometry::Vec3;

/// Thresholds that shape the two fields.
pub mod field_constants {
    /// Local temperature at which grain starts to show heat.
    pub const HEAT_ONSET: f32 = 28.0;
    /// Degrees above onset at which the heat blend saturates.
    pub const HEAT_SPAN: f32 = 15.0;
    /// Ambient humidity at or below which the leak is dry.
    pub const HUMID_THRESHOLD: f32 = 60.0;
    /// Percent above threshold at which leak severity saturates.
    pub const HUMID_SPAN: f32 = 40.0;
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Both fields frozen at one environment state.
#[derive(Debug, Clone, Copy)]
pub struct FieldSnapshot {
    temperatures: [f32; 3],
    sensor_heights: [f32; 3],
    leak_center: Vec3,
    leak_radius: f32,
    /// Zero when ambient humidity is at or below the threshold.
    leak_severity: f32,
}

impl FieldSnapshot {
    pub fn new(state: &EnvironmentState, silo: &SiloGeometry) -> Self {
        use field_constants::*;

        let humidity = state.humidity as f32;
        let leak_severity = if humidity > HUMID_THRESHOLD {
            clamp01((humidity - HUMID_THRESHOLD) / HUMID_SPAN)
        } else {
            0.0
        };

        Self {
            temperatures: [
                state.temperatures[0] as f32,
                state.temperatures[1] as f32,
                state.temperatures[2] as f32,
            ],
            sensor_heights: silo.sensor_heights,
            leak_center: silo.leak_center,
            leak_radius: silo.leak_radius,
            leak_severity,
        }
    }

    /// Interpolated temperature at height `y`.
    pub fn temperature_at(&self, y: f32) -> f32 {
        let [t1, t2, t3] = self.temperatures;
        let [h1, h2, h3] = self.sensor_heights;
        if y < h2 {
            let t = clamp01((y - h1) / (h2 - h1));
            t1 + (t2 - t1) * t
        } else {
            let t = clamp01((y - h2) / (h3 - h2));
            t2 + (t3 - t2) * t
        }
    }

    /// Heat blend weight in [0, 1] at height `y`.
    pub fn heat_factor(&self, y: f32) -> f32 {
        use field_constants::*;
        clamp01((self.temperature_at(y) - HEAT_ONSET) / HEAT_SPAN)
    }

    /// Wetness blend weight in [0, 1] at `position`.
    pub fn wet_factor(&self, position: Vec3) -> f32 {
        if self.leak_severity <= 0.0 {
            return 0.0;
        }
        let dist = position.distance(&self.leak_center);
        if dist < self.leak_radius {
            clamp01(1.0 - dist / self.leak_radius) * self.leak_severity
        } else {
            0.0
        }
    }

    pub fn is_humid(&self) -> bool {
        self.leak_severity > 0.0
    }

    /// Heat and wetness blend weights at `position`, in that order.
    pub fn factors_at(&self, position: Vec3) -> (f32, f32) {
        (self.heat_factor(position.y), self.wet_factor(position))
    }

    /// Display color for a particle at `position`.
    pub fn color_at(&self, position: Vec3) -> Rgb {
        let (heat, wet) = self.factors_at(position);
        blend(heat, wet)
    }
}

/// Grain color for the given blend weights.
///
/// Heat is blended first and wetness second, so moisture wins where the
/// two overlap.
pub fn blend(heat: f32, wet: f32) -> Rgb {
    let mut color = palette::GRAIN_GOLD;
    if heat > 0.0 {
        color = color.lerp(palette::HEAT_ORANGE, heat);
    }
    if wet > 0.0 {
        color = color.lerp(palette::WET_CYAN, wet);
    }
    color
}
