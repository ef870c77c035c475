//! RGB colors and the grain palette.

use serde::{Deserialize, Serialize};

/// Linear RGB triple with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Blend toward `target` by `t` (0.0 = self, 1.0 = target).
    ///
    /// Written as a weighted sum so both endpoints are reproduced exactly.
    pub fn lerp(self, target: Rgb, t: f32) -> Rgb {
        let s = 1.0 - t;
        Rgb {
            r: self.r * s + target.r * t,
            g: self.g * s + target.g * t,
            b: self.b * s + target.b * t,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Colors used by the silo visualization.
pub mod palette {
    use super::Rgb;

    /// Healthy grain (#fcd34d).
    pub const GRAIN_GOLD: Rgb = Rgb::new(0.99, 0.83, 0.30);
    /// Hot spot blend target.
    pub const HEAT_ORANGE: Rgb = Rgb::new(0.94, 0.27, 0.27);
    /// Moisture blend target.
    pub const WET_CYAN: Rgb = Rgb::new(0.02, 0.71, 0.83);

    /// Sensor probe within limits.
    pub const PROBE_OK: Rgb = Rgb::new(0.13, 0.77, 0.37);
    /// Sensor probe reading a hot spot.
    pub const PROBE_HOT: Rgb = Rgb::new(0.94, 0.27, 0.27);
    /// Silo shell tint (#94a3b8).
    pub const SHELL: Rgb = Rgb::new(0.58, 0.64, 0.72);
}

#[cfg(test)]
mod tests {
    use super::palette::*;
    use super::*;

    #[test]
    fn test_lerp_endpoints_exact() {
        assert_eq!(GRAIN_GOLD.lerp(WET_CYAN, 0.0), GRAIN_GOLD);
        assert_eq!(GRAIN_GOLD.lerp(WET_CYAN, 1.0), WET_CYAN);
        assert_eq!(HEAT_ORANGE.lerp(WET_CYAN, 1.0), WET_CYAN);
    }

    #[test]
    fn test_lerp_midpoint() {
        let black = Rgb::new(0.0, 0.0, 0.0);
        let white = Rgb::new(1.0, 1.0, 1.0);
        let mid = black.lerp(white, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);
        assert!((mid.g - 0.5).abs() < 1e-6);
        assert!((mid.b - 0.5).abs() < 1e-6);
    }
}
