//! Integration tests for the field-to-color mapping.
//!
//! Exercises: EnvironmentState → FieldSnapshot → per-position color,
//! sweeping positions through the whole grain cylinder.

use graintwin_logic::color::palette::{GRAIN_GOLD, HEAT_ORANGE, WET_CYAN};
use graintwin_logic::config::SiloGeometry;
use graintwin_logic::environment::EnvironmentState;
use graintwin_logic::field::FieldSnapshot;
use graintwin_logic::geometry::Vec3;

// ── Helpers ────────────────────────────────────────────────────────────

/// Deterministic grid of positions covering the grain cylinder.
fn sample_positions(silo: &SiloGeometry) -> Vec<Vec3> {
    let mut positions = Vec::new();
    for iy in 0..=20 {
        let y = silo.height * iy as f32 / 20.0;
        for ir in 0..=8 {
            let r = silo.radius * ir as f32 / 8.0;
            for ia in 0..16 {
                let theta = std::f32::consts::TAU * ia as f32 / 16.0;
                positions.push(Vec3::new(r * theta.cos(), y, r * theta.sin()));
            }
        }
    }
    positions
}

fn state(temps: [f64; 3], humidity: f64) -> EnvironmentState {
    EnvironmentState {
        temperatures: temps,
        humidity,
        ..Default::default()
    }
}

fn in_unit_range(c: graintwin_logic::color::Rgb) -> bool {
    [c.r, c.g, c.b].iter().all(|v| (0.0..=1.0).contains(v))
}

// ── Wetness ────────────────────────────────────────────────────────────

#[test]
fn dry_air_never_wets() {
    let silo = SiloGeometry::default();
    for humidity in [0.0, 45.0, 59.9, 60.0] {
        let fields = FieldSnapshot::new(&state([25.0; 3], humidity), &silo);
        for p in sample_positions(&silo) {
            assert_eq!(fields.wet_factor(p), 0.0, "humidity {humidity} at {p:?}");
        }
        assert_eq!(fields.wet_factor(silo.leak_center), 0.0);
    }
}

#[test]
fn saturated_leak_center_is_pure_wet_color() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&state([25.0; 3], 100.0), &silo);
    assert_eq!(fields.wet_factor(silo.leak_center), 1.0);
    assert_eq!(fields.color_at(silo.leak_center), WET_CYAN);
}

#[test]
fn wetness_clamped_above_full_humidity() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&state([25.0; 3], 140.0), &silo);
    assert_eq!(fields.wet_factor(silo.leak_center), 1.0);
    for p in sample_positions(&silo) {
        let w = fields.wet_factor(p);
        assert!((0.0..=1.0).contains(&w));
    }
}

#[test]
fn wetness_zero_outside_leak_radius() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&state([25.0; 3], 95.0), &silo);
    for p in sample_positions(&silo) {
        if p.distance(&silo.leak_center) >= silo.leak_radius {
            assert_eq!(fields.wet_factor(p), 0.0);
        } else {
            assert!(fields.wet_factor(p) >= 0.0);
        }
    }
}

// ── Heat ───────────────────────────────────────────────────────────────

#[test]
fn baseline_readings_render_gold() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&EnvironmentState::default(), &silo);
    for p in sample_positions(&silo) {
        assert_eq!(fields.color_at(p), GRAIN_GOLD);
    }
}

#[test]
fn middle_heat_spike_reddens_mid_height_only() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&state([25.0, 45.0, 25.0], 45.0), &silo);

    let mid = fields.color_at(Vec3::new(0.0, 2.0, 0.0));
    let floor = fields.color_at(Vec3::new(0.0, 0.0, 0.0));
    let surface = fields.color_at(Vec3::new(0.0, 4.0, 0.0));

    assert_eq!(floor, GRAIN_GOLD);
    assert_eq!(surface, GRAIN_GOLD);
    assert!(mid.g < GRAIN_GOLD.g, "mid-height should blend toward red");
    assert!(mid.g >= HEAT_ORANGE.g);
}

#[test]
fn colors_stay_in_unit_range() {
    let silo = SiloGeometry::default();
    for (temps, humidity) in [
        ([25.0, 45.0, 25.0], 95.0),
        ([60.0, 60.0, 60.0], 100.0),
        ([-10.0, 0.0, 10.0], 61.0),
    ] {
        let fields = FieldSnapshot::new(&state(temps, humidity), &silo);
        for p in sample_positions(&silo) {
            assert!(in_unit_range(fields.color_at(p)));
        }
    }
}

#[test]
fn wet_blend_dominates_overlap() {
    let silo = SiloGeometry::default();
    let fields = FieldSnapshot::new(&state([45.0, 45.0, 45.0], 100.0), &silo);
    // Half-way to the leak edge: wet 0.5 applied over full heat.
    let p = Vec3::new(silo.leak_center.x - silo.leak_radius / 2.0, 1.0, 0.0);
    let c = fields.color_at(p);
    let expected = HEAT_ORANGE.lerp(WET_CYAN, 0.5);
    assert!((c.r - expected.r).abs() < 1e-5);
    assert!((c.g - expected.g).abs() < 1e-5);
    assert!((c.b - expected.b).abs() < 1e-5);
}
