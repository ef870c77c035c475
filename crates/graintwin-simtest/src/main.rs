//! GrainTwin Headless Simulation Harness
//!
//! Sweeps every scenario and checks the field, history and report invariants.
//! Runs entirely in-process: no window, no report service.
//!
//! Usage:
//!   cargo run -p graintwin-simtest
//!   cargo run -p graintwin-simtest -- --verbose
//!   cargo run -p graintwin-simtest -- --config twin.json --json

use std::sync::Arc;

use graintwin_core::config::load_config;
use graintwin_core::engine::TwinEngine;
use graintwin_core::report::{ReportError, ReportService};
use graintwin_logic::color::{palette, Rgb};
use graintwin_logic::config::{validate_config, TwinConfig};
use graintwin_logic::environment::{EnvironmentState, PestPosition, ScenarioMode};
use graintwin_logic::field::FieldSnapshot;
use graintwin_logic::geometry::Vec3;
use graintwin_logic::history::{HistoryBuffer, HistoryPoint};
use graintwin_logic::report::{build_prompt, ReportBoard, ReportTicket};
use graintwin_logic::status::{assess, Hazard};
use serde::Serialize;

const SWEEP_SEEDS: u64 = 8;

/// Report service that is never reachable; the harness stays offline.
struct Offline;

impl ReportService for Offline {
    fn generate(&self, _prompt: &str) -> Result<String, ReportError> {
        Err(ReportError::MissingApiKey("harness".into()))
    }
}

// ── Test harness ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    passed: usize,
    failed: usize,
    results: &'a [TestResult],
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let json = args.iter().any(|a| a == "--json");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));

    println!("=== GrainTwin Simulation Harness ===\n");

    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(c) => {
                println!("Loaded config from {}", path);
                c
            }
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => TwinConfig::default(),
    };

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_configuration(&config, verbose));

    // 2. Particle field generation
    results.extend(validate_particle_field(&config, verbose));

    // 3. Field-to-color mapping
    results.extend(validate_color_mapping(&config, verbose));

    // 4. Scenario sweeps
    results.extend(validate_scenarios(&config, verbose));

    // 5. History buffer
    results.extend(validate_history(&config, verbose));

    // 6. Report sequencing
    results.extend(validate_report_guard(verbose));

    // 7. Status assessment
    results.extend(validate_status(verbose));

    // 8. Serialization round-trip
    results.extend(validate_round_trip(&config, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if json {
        let summary = Summary {
            passed,
            failed,
            results: &results,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to encode summary: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn engine(config: &TwinConfig, seed: u64) -> TwinEngine {
    let mut config = config.clone();
    config.seed = Some(seed);
    TwinEngine::with_report_service(config, Arc::new(Offline))
}

fn run(engine: &mut TwinEngine, mode: ScenarioMode, ticks: u64) -> Vec<EnvironmentState> {
    engine.set_scenario(mode);
    let start = engine.tick_count();
    (0..ticks)
        .map(|i| {
            engine.tick_at((start + i) * 1000);
            engine.state().clone()
        })
        .collect()
}

/// JSON float parsing may differ from the original by an ulp.
fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9
}

fn states_close(a: &EnvironmentState, b: &EnvironmentState) -> bool {
    a.temperatures
        .iter()
        .zip(b.temperatures.iter())
        .all(|(x, y)| close(*x, *y))
        && close(a.humidity, b.humidity)
        && a.pest_count == b.pest_count
        && a.last_updated == b.last_updated
        && match (a.pest_position, b.pest_position) {
            (Some(p), Some(q)) => close(p.x, q.x) && close(p.y, q.y),
            (None, None) => true,
            _ => false,
        }
}

fn color_in_unit_range(c: Rgb) -> bool {
    c.to_array().iter().all(|v| (0.0..=1.0).contains(v))
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_configuration(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let mut results = Vec::new();

    let errors = validate_config(config);
    results.push(check(
        "config_valid",
        errors.is_empty(),
        if errors.is_empty() {
            "no validation errors".to_string()
        } else {
            format!("{:?}", errors)
        },
    ));

    let defaults = validate_config(&TwinConfig::default());
    results.push(check(
        "config_defaults_valid",
        defaults.is_empty(),
        format!("{} errors in defaults", defaults.len()),
    ));

    if verbose {
        println!(
            "  {} particles, cylinder r={} h={}, tick {}s",
            config.silo.particle_count, config.silo.radius, config.silo.height, config.tick_seconds
        );
    }

    results
}

// ── 2. Particle Field ───────────────────────────────────────────────────

fn validate_particle_field(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Particle Field ---");
    let mut results = Vec::new();
    let silo = &config.silo;

    let engine = engine(config, 1);
    let field = engine.particles();

    results.push(check(
        "particles_count",
        field.len() == silo.particle_count,
        format!("{} generated, {} configured", field.len(), silo.particle_count),
    ));

    let outside = field
        .positions()
        .iter()
        .filter(|p| p.radial() > silo.radius + 1e-4 || p.y < 0.0 || p.y > silo.height)
        .count();
    results.push(check(
        "particles_inside_cylinder",
        outside == 0,
        format!("{} outside", outside),
    ));

    // Area-uniform disc: the inner half of the radius holds a quarter of the points.
    let inner = field
        .positions()
        .iter()
        .filter(|p| p.radial() < silo.radius * 0.5)
        .count() as f32
        / field.len().max(1) as f32;
    results.push(check(
        "particles_area_uniform",
        (inner - 0.25).abs() < 0.03,
        format!("inner-half fraction {:.3} (expect 0.25)", inner),
    ));

    let other = self::engine(config, 1);
    results.push(check(
        "particles_seed_reproducible",
        other.particles().positions() == field.positions(),
        "same seed yields same field",
    ));

    if verbose {
        let mean_y = field.positions().iter().map(|p| p.y).sum::<f32>() / field.len().max(1) as f32;
        println!("  mean height {:.3} (expect {:.3})", mean_y, silo.height / 2.0);
    }

    results
}

// ── 3. Color Mapping ────────────────────────────────────────────────────

fn validate_color_mapping(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Color Mapping ---");
    let mut results = Vec::new();
    let silo = &config.silo;
    let leak = silo.leak_center;

    let baseline = FieldSnapshot::new(&EnvironmentState::default(), silo);
    let all_gold = (0..=40).all(|i| {
        let y = silo.height * i as f32 / 40.0;
        baseline.color_at(Vec3::new(0.0, y, 0.0)) == palette::GRAIN_GOLD
    });
    results.push(check(
        "color_baseline_gold",
        all_gold,
        "initial readings render pure grain gold",
    ));

    let saturated = EnvironmentState {
        humidity: 100.0,
        ..Default::default()
    };
    let wet = FieldSnapshot::new(&saturated, silo);
    results.push(check(
        "color_leak_center_cyan",
        wet.color_at(leak) == palette::WET_CYAN,
        format!("{:?}", wet.color_at(leak)),
    ));

    let edge = leak + Vec3::new(silo.leak_radius, 0.0, 0.0);
    results.push(check(
        "color_leak_edge_dry",
        wet.wet_factor(edge) == 0.0,
        format!("wet factor at radius {:.3}", wet.wet_factor(edge)),
    ));

    let dry_air = EnvironmentState {
        humidity: 60.0,
        ..Default::default()
    };
    results.push(check(
        "color_threshold_dry",
        FieldSnapshot::new(&dry_air, silo).wet_factor(leak) == 0.0,
        "60% humidity leaves the leak dry",
    ));

    let extreme = EnvironmentState {
        temperatures: [80.0, -20.0, 120.0],
        humidity: 150.0,
        ..Default::default()
    };
    let fields = FieldSnapshot::new(&extreme, silo);
    let mut out_of_range = 0;
    for i in 0..=20 {
        for j in -10..=10 {
            let p = Vec3::new(j as f32 * 0.19, silo.height * i as f32 / 20.0, 0.0);
            if !color_in_unit_range(fields.color_at(p)) {
                out_of_range += 1;
            }
        }
    }
    results.push(check(
        "color_unit_range",
        out_of_range == 0,
        format!("{} samples outside [0,1]", out_of_range),
    ));

    if verbose {
        let spike = EnvironmentState {
            temperatures: [25.0, 43.0, 25.0],
            ..Default::default()
        };
        let f = FieldSnapshot::new(&spike, silo);
        println!(
            "  heat factor at middle probe: {:.3}",
            f.heat_factor(silo.sensor_heights[1])
        );
    }

    results
}

// ── 4. Scenario Sweeps ──────────────────────────────────────────────────

fn validate_scenarios(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenario Sweeps ---");
    let mut results = Vec::new();
    let tuning = &config.scenario;

    let mut heat_ok = true;
    let mut humid_ok = true;
    let mut cool_ok = true;
    let mut pest_ok = true;
    let mut consistent = true;

    for seed in 0..SWEEP_SEEDS {
        let mut engine = engine(config, seed);

        let mut prev = engine.state().clone();
        for s in run(&mut engine, ScenarioMode::HeatSpike, 200) {
            heat_ok &= s.middle() >= prev.middle() && s.middle() <= tuning.heat_spike_max;
            consistent &= s.is_consistent();
            prev = s;
        }
        heat_ok &= prev.middle() == tuning.heat_spike_max;

        for s in run(&mut engine, ScenarioMode::HighHumidity, 100) {
            humid_ok &= s.humidity >= prev.humidity && s.humidity <= tuning.humidity_max;
            consistent &= s.is_consistent();
            prev = s;
        }

        for s in run(&mut engine, ScenarioMode::PestInvasion, 300) {
            pest_ok &= s.pest_count == 1
                && s.pest_position.map_or(false, |p| {
                    p.x.abs() <= tuning.pest_bound && p.y.abs() <= tuning.pest_bound
                });
            consistent &= s.is_consistent();
            prev = s;
        }

        for s in run(&mut engine, ScenarioMode::Normal, 1000) {
            for i in 0..3 {
                if prev.temperatures[i] >= tuning.baseline_temperature + tuning.temperature_jitter {
                    cool_ok &= s.temperatures[i] <= prev.temperatures[i];
                }
            }
            pest_ok &= s.pest_count == 0 && s.pest_position.is_none();
            consistent &= s.is_consistent();
            prev = s;
        }
        cool_ok &= prev
            .temperatures
            .iter()
            .all(|t| (t - tuning.baseline_temperature).abs() <= tuning.temperature_jitter);

        if verbose {
            println!(
                "  seed {}: settled at {:?}, humidity {:.1}",
                seed, prev.temperatures, prev.humidity
            );
        }
    }

    results.push(check(
        "scenario_heat_spike_capped",
        heat_ok,
        format!("middle probe rises monotonically to {}", tuning.heat_spike_max),
    ));
    results.push(check(
        "scenario_humidity_capped",
        humid_ok,
        format!("humidity rises monotonically to at most {}", tuning.humidity_max),
    ));
    results.push(check(
        "scenario_normal_cools",
        cool_ok,
        format!("temperatures relax to {}", tuning.baseline_temperature),
    ));
    results.push(check(
        "scenario_pest_bounded",
        pest_ok,
        format!("pest stays within ±{} and clears in Normal", tuning.pest_bound),
    ));
    results.push(check(
        "scenario_states_consistent",
        consistent,
        "pest count matches position and readings stay finite",
    ));

    results
}

// ── 5. History ──────────────────────────────────────────────────────────

fn validate_history(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- History ---");
    let mut results = Vec::new();
    let capacity = config.history_capacity;

    let mut buffer = HistoryBuffer::new(capacity);
    let mut state = EnvironmentState::initial(0);
    for i in 0..=capacity as u64 {
        state.last_updated = i * 1000;
        state.humidity = i as f64;
        buffer.push(HistoryPoint::from_state(&state));
    }
    results.push(check(
        "history_capped",
        buffer.len() == capacity,
        format!("{} points after {} appends", buffer.len(), capacity + 1),
    ));
    results.push(check(
        "history_evicts_oldest",
        buffer.oldest().map(|p| p.humidity) == Some(1.0),
        "first point evicted",
    ));
    results.push(check(
        "history_ordered",
        buffer
            .humidity_series()
            .windows(2)
            .all(|w| w[0] < w[1]),
        "points stay in insertion order",
    ));

    let mut engine = engine(config, 3);
    run(&mut engine, ScenarioMode::HeatSpike, capacity as u64 + 5);
    let series = engine.history().temperature_series(1);
    results.push(check(
        "history_tracks_engine",
        series.len() == capacity && engine.history().latest().map(|p| p.temp2) == Some(engine.state().middle()),
        format!("{} middle-probe points", series.len()),
    ));

    if verbose {
        if let Some(p) = engine.history().latest() {
            println!("  latest point {} {:.2}°C", p.time, p.temp2);
        }
    }

    results
}

// ── 6. Report Guard ─────────────────────────────────────────────────────

fn validate_report_guard(verbose: bool) -> Vec<TestResult> {
    println!("--- Report Guard ---");
    let mut results = Vec::new();

    let mut board = ReportBoard::new();
    let first = board.issue();
    let second = board.issue();
    let newer_shown = board.complete(second, "second".into());
    let stale_shown = board.complete(first, "first".into());
    results.push(check(
        "report_newest_wins",
        newer_shown && !stale_shown && board.text() == Some("second"),
        "late answer to an older request is dropped",
    ));
    results.push(check(
        "report_idle_after_answers",
        !board.is_analyzing(),
        format!("{} in flight", board.in_flight()),
    ));

    board.issue();
    results.push(check(
        "report_issue_clears_panel",
        board.text().is_none() && board.is_analyzing(),
        "new request hides the previous report",
    ));
    results.push(check(
        "report_unknown_ticket_ignored",
        !board.complete(ReportTicket(0), "ghost".into()),
        "ticket 0 never displays",
    ));

    let pest = EnvironmentState {
        pest_count: 1,
        pest_position: Some(PestPosition::new(0.25, -0.5)),
        ..Default::default()
    };
    let prompt = build_prompt(&pest);
    results.push(check(
        "report_prompt_has_readings",
        prompt.contains("24.50") && prompt.contains("45.0") && prompt.contains("0.25"),
        format!("{} chars", prompt.chars().count()),
    ));

    if verbose {
        println!("  prompt:\n{}", prompt);
    }

    results
}

// ── 7. Status ───────────────────────────────────────────────────────────

fn validate_status(verbose: bool) -> Vec<TestResult> {
    println!("--- Status ---");
    let mut results = Vec::new();

    let calm = assess(&EnvironmentState::default());
    results.push(check(
        "status_calm_safe",
        calm.hazard == Hazard::Safe,
        format!("{:?}", calm.hazard),
    ));

    let hot = EnvironmentState {
        temperatures: [25.0, 35.0, 25.0],
        ..Default::default()
    };
    let status = assess(&hot);
    results.push(check(
        "status_hot_warning",
        status.hazard == Hazard::Warning && status.hot_sensors == [false, true, false],
        format!("{:?}", status),
    ));

    let worst = EnvironmentState {
        temperatures: [25.0, 35.0, 25.0],
        humidity: 90.0,
        pest_count: 1,
        pest_position: Some(PestPosition::new(0.2, 0.2)),
        last_updated: 0,
    };
    results.push(check(
        "status_combined_danger",
        assess(&worst).hazard == Hazard::Danger,
        "heat, mold and pest together",
    ));

    if verbose {
        println!("  worst case: {:?}", assess(&worst));
    }

    results
}

// ── 8. Round-trip ───────────────────────────────────────────────────────

fn validate_round_trip(config: &TwinConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Round-trip ---");
    let mut results = Vec::new();

    let mut engine = engine(config, 5);
    run(&mut engine, ScenarioMode::PestInvasion, 12);
    run(&mut engine, ScenarioMode::HeatSpike, 12);

    let state = engine.state();
    let decoded = serde_json::to_string(state)
        .and_then(|json| serde_json::from_str::<EnvironmentState>(&json));
    results.push(check(
        "roundtrip_state",
        decoded.as_ref().map_or(false, |d| states_close(d, state)),
        match &decoded {
            Ok(_) => "readings survive JSON encode/decode".to_string(),
            Err(e) => e.to_string(),
        },
    ));

    let history = engine.history();
    let decoded = serde_json::to_string(history)
        .and_then(|json| serde_json::from_str::<HistoryBuffer>(&json));
    results.push(check(
        "roundtrip_history",
        decoded.as_ref().map_or(false, |d| {
            d.len() == history.len()
                && d.iter().zip(history.iter()).all(|(a, b)| {
                    a.time == b.time
                        && a.pest_count == b.pest_count
                        && close(a.temp2, b.temp2)
                        && close(a.humidity, b.humidity)
                })
        }),
        format!("{} points", history.len()),
    ));

    if verbose {
        if let Ok(json) = serde_json::to_string(state) {
            println!("  {}", json);
        }
    }

    results
}
