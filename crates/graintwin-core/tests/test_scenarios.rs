//! Integration tests for the tick driver under each scenario.
//!
//! Exercises: TwinEngine → scenario stepper → history, over long runs with
//! fixed seeds. All tests are headless and offline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use graintwin_core::engine::TwinEngine;
use graintwin_core::report::{ReportError, ReportService};
use graintwin_logic::config::TwinConfig;
use graintwin_logic::environment::{EnvironmentState, ScenarioMode};
use graintwin_logic::report::REPORT_FAILURE_TEXT;

// ── Helpers ────────────────────────────────────────────────────────────

struct Offline;

impl ReportService for Offline {
    fn generate(&self, _prompt: &str) -> Result<String, ReportError> {
        Err(ReportError::Malformed("offline".into()))
    }
}

/// Answers after a delay that shrinks with each call, so later requests
/// finish first.
struct Staggered {
    calls: std::sync::atomic::AtomicU64,
}

impl ReportService for Staggered {
    fn generate(&self, prompt: &str) -> Result<String, ReportError> {
        let n = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let delay = if n == 0 { 300 } else { 10 };
        std::thread::sleep(Duration::from_millis(delay));
        Ok(format!("report #{} ({} chars)", n + 1, prompt.len()))
    }
}

fn engine_with(seed: u64, service: Arc<dyn ReportService>) -> TwinEngine {
    let mut config = TwinConfig::default();
    config.seed = Some(seed);
    config.silo.particle_count = 500;
    TwinEngine::with_report_service(config, service)
}

fn engine(seed: u64) -> TwinEngine {
    engine_with(seed, Arc::new(Offline))
}

fn run(engine: &mut TwinEngine, mode: ScenarioMode, ticks: u64) -> Vec<EnvironmentState> {
    engine.set_scenario(mode);
    let mut states = Vec::new();
    for i in 0..ticks {
        engine.tick_at(i * 1000);
        states.push(engine.state().clone());
    }
    states
}

fn wait_for_report(engine: &mut TwinEngine) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.is_analyzing() && Instant::now() < deadline {
        engine.poll_reports();
        std::thread::sleep(Duration::from_millis(5));
    }
}

// ── Scenario properties ────────────────────────────────────────────────

#[test]
fn normal_mode_cools_to_baseline() {
    for seed in 0..5 {
        let mut engine = engine(seed);
        run(&mut engine, ScenarioMode::HeatSpike, 60);
        assert!(engine.state().middle() > 30.0);

        let mut prev = engine.state().clone();
        for state in run(&mut engine, ScenarioMode::Normal, 600) {
            for i in 0..3 {
                // Within one jitter of baseline the noise may lift a reading.
                if prev.temperatures[i] >= 25.05 {
                    assert!(
                        state.temperatures[i] <= prev.temperatures[i],
                        "seed {seed}: sensor {i} rose from {} to {}",
                        prev.temperatures[i],
                        state.temperatures[i]
                    );
                }
            }
            prev = state;
        }
        for t in prev.temperatures {
            assert!((t - 25.0).abs() < 0.05, "seed {seed}: settled at {t}");
        }
    }
}

#[test]
fn normal_mode_keeps_sensor_noise_at_baseline() {
    let mut engine = engine(6);
    let states = run(&mut engine, ScenarioMode::Normal, 200);
    let settled = &states[100..];
    assert!(settled
        .iter()
        .all(|s| s.temperatures.iter().all(|t| (t - 25.0).abs() < 0.05)));
    assert!(settled.iter().all(|s| (s.humidity - 45.0).abs() < 0.1));

    let distinct: std::collections::HashSet<String> = settled
        .iter()
        .map(|s| format!("{:?} {}", s.temperatures, s.humidity))
        .collect();
    assert!(distinct.len() > 1, "readings froze at {:?}", settled[0]);
}

#[test]
fn heat_spike_is_monotone_and_capped() {
    for seed in 0..5 {
        let mut engine = engine(seed);
        let mut prev = engine.state().middle();
        for state in run(&mut engine, ScenarioMode::HeatSpike, 200) {
            assert!(state.middle() >= prev, "seed {seed}: middle probe cooled");
            assert!(state.middle() <= 45.0);
            prev = state.middle();
        }
        assert_eq!(prev, 45.0);
    }
}

#[test]
fn high_humidity_is_monotone_and_capped() {
    for seed in 0..5 {
        let mut engine = engine(seed);
        let mut prev = engine.state().humidity;
        for state in run(&mut engine, ScenarioMode::HighHumidity, 100) {
            assert!(state.humidity >= prev, "seed {seed}: humidity fell");
            assert!(state.humidity <= 95.0);
            prev = state.humidity;
        }
        assert_eq!(prev, 95.0);
    }
}

#[test]
fn pest_invariant_holds_across_modes() {
    let mut engine = engine(3);
    for mode in [
        ScenarioMode::PestInvasion,
        ScenarioMode::HeatSpike,
        ScenarioMode::PestInvasion,
        ScenarioMode::Normal,
        ScenarioMode::PestInvasion,
    ] {
        for state in run(&mut engine, mode, 200) {
            assert!(state.pest_count <= 1);
            assert_eq!(state.pest_count > 0, state.pest_position.is_some());
            if let Some(pos) = state.pest_position {
                assert!(pos.in_bounds(), "pest escaped to {pos:?}");
            }
        }
    }
}

#[test]
fn pest_spawns_after_one_tick() {
    let mut engine = engine(8);
    assert_eq!(engine.state().temperatures, [24.5, 25.0, 24.8]);
    assert_eq!(engine.state().pest_count, 0);

    let states = run(&mut engine, ScenarioMode::PestInvasion, 1);
    let pos = states[0].pest_position.expect("pest should be positioned");
    assert_eq!(states[0].pest_count, 1);
    assert!((-1.0..=1.0).contains(&pos.x) && (-1.0..=1.0).contains(&pos.y));
}

#[test]
fn history_keeps_last_thirty_ticks() {
    let mut engine = engine(1);
    run(&mut engine, ScenarioMode::Normal, 31);
    let history = engine.history();
    assert_eq!(history.len(), 30);
    // Ticks are stamped one second apart from zero: tick 1 is 00:00:00.
    assert!(history.iter().all(|p| p.time != "00:00:00"));
    assert_eq!(history.latest().unwrap().time, "00:00:30");
}

// ── Reports ────────────────────────────────────────────────────────────

#[test]
fn report_failure_shows_apology() {
    let mut engine = engine(2);
    engine.request_report();
    assert!(engine.is_analyzing());
    wait_for_report(&mut engine);
    assert_eq!(engine.report_text(), Some(REPORT_FAILURE_TEXT));
}

#[test]
fn report_does_not_block_ticks() {
    let service = Arc::new(Staggered {
        calls: Default::default(),
    });
    let mut engine = engine_with(4, service);
    engine.request_report();
    let before = Instant::now();
    run(&mut engine, ScenarioMode::HeatSpike, 10);
    assert!(before.elapsed() < Duration::from_millis(250));
    assert_eq!(engine.tick_count(), 10);
    wait_for_report(&mut engine);
}

#[test]
fn late_stale_report_is_discarded() {
    let service = Arc::new(Staggered {
        calls: Default::default(),
    });
    let mut engine = engine_with(5, service);
    engine.request_report(); // slow
    std::thread::sleep(Duration::from_millis(20));
    engine.request_report(); // fast
    wait_for_report(&mut engine);

    // The slow first answer lands after the second and is dropped.
    assert!(!engine.is_analyzing());
    let text = engine.report_text().expect("a report should be shown");
    assert!(text.starts_with("report #2"), "got {text}");

    engine.dismiss_report();
    assert_eq!(engine.report_text(), None);
}
