//! Twin engine - owns the silo state and paces the tick and frame drivers

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use graintwin_logic::config::{validate_config, TwinConfig};
use graintwin_logic::environment::{EnvironmentState, ScenarioMode};
use graintwin_logic::history::{HistoryBuffer, HistoryPoint};
use graintwin_logic::report::{build_prompt, ReportBoard, ReportTicket};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::generation::{generate_particles, ParticleField};
use crate::report::{default_service, ReportDesk, ReportService};
use crate::systems::{recolor_particles, step_environment, RecolorStats};

/// Milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Main twin engine
///
/// Single writer of the environment state. Both drivers run on the caller's
/// thread: [`update`](Self::update) paces ticks from elapsed frame time and
/// [`render_frame`](Self::render_frame) recolors the particle field.
pub struct TwinEngine {
    config: TwinConfig,
    /// Latest readings
    state: EnvironmentState,
    /// Scenario applied on the next tick
    mode: ScenarioMode,
    history: HistoryBuffer,
    particles: ParticleField,
    reports: ReportBoard,
    desk: ReportDesk,
    rng: ChaCha8Rng,

    // Tick pacing
    tick_accumulator: f32,
    tick_count: u64,
    time_scale: f32,
    /// Scaled seconds since start
    sim_time: f64,
}

impl TwinEngine {
    /// Create an engine backed by the HTTP report service from `config`.
    pub fn new(config: TwinConfig) -> Self {
        let service = default_service(&config.report);
        Self::with_report_service(config, service)
    }

    /// Create an engine with a custom report service.
    ///
    /// An invalid config is logged and replaced by the defaults, keeping
    /// only its seed.
    pub fn with_report_service(config: TwinConfig, service: Arc<dyn ReportService>) -> Self {
        let errors = validate_config(&config);
        let config = if errors.is_empty() {
            config
        } else {
            for error in &errors {
                log::warn!("Invalid twin config: {}", error);
            }
            TwinConfig {
                seed: config.seed,
                ..TwinConfig::default()
            }
        };

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let particles = generate_particles(&config.silo, &mut rng);

        log::info!(
            "Twin engine ready: {} particles, tick every {}s, history of {}",
            particles.len(),
            config.tick_seconds,
            config.history_capacity
        );

        Self {
            state: EnvironmentState::initial(now_millis()),
            mode: ScenarioMode::Normal,
            history: HistoryBuffer::new(config.history_capacity),
            particles,
            reports: ReportBoard::new(),
            desk: ReportDesk::new(service),
            rng,
            tick_accumulator: 0.0,
            tick_count: 0,
            time_scale: 1.0,
            sim_time: 0.0,
            config,
        }
    }

    /// Advance the tick driver by `delta_seconds` of real time.
    ///
    /// Fires at most one tick per call. Time owed beyond one extra period is
    /// dropped, so a stalled caller gets one late tick rather than a burst.
    /// Returns whether a tick fired.
    pub fn update(&mut self, delta_seconds: f32) -> bool {
        let scaled = delta_seconds.max(0.0) * self.time_scale;
        self.sim_time += scaled as f64;
        self.tick_accumulator += scaled;

        let period = self.config.tick_seconds;
        if self.tick_accumulator < period {
            return false;
        }

        let overdue = self.tick_accumulator - period;
        if overdue >= period {
            log::debug!("Tick {} running {:.2}s late", self.tick_count + 1, overdue);
            self.tick_accumulator = 0.0;
        } else {
            self.tick_accumulator = overdue;
        }

        self.tick();
        true
    }

    /// Run one tick now, stamped with the wall clock.
    pub fn tick(&mut self) {
        self.tick_at(now_millis());
    }

    /// Run one tick stamped with `timestamp` (ms since epoch).
    pub fn tick_at(&mut self, timestamp: u64) {
        // The mode is captured here; a switch during the tick applies next time.
        let mode = self.mode;
        self.state = step_environment(
            &self.state,
            mode,
            &self.config.scenario,
            timestamp,
            &mut self.rng,
        );
        self.history.push(HistoryPoint::from_state(&self.state));
        self.tick_count += 1;
    }

    /// Frame driver: collect finished reports and recolor every particle.
    pub fn render_frame(&mut self) -> RecolorStats {
        self.poll_reports();
        recolor_particles(&mut self.particles, &self.state, &self.config.silo)
    }

    pub fn set_scenario(&mut self, mode: ScenarioMode) {
        if mode != self.mode {
            log::info!("Scenario switched: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn scenario(&self) -> ScenarioMode {
        self.mode
    }

    // ── Reports ─────────────────────────────────────────────────────────

    /// Ask the report service about the current readings. Never blocks.
    pub fn request_report(&mut self) -> ReportTicket {
        let prompt = build_prompt(&self.state);
        let ticket = self.reports.issue();
        log::info!("Report {} requested", ticket.0);
        self.desk.submit(ticket, prompt);
        ticket
    }

    /// Move finished report requests onto the board. Returns how many were shown.
    pub fn poll_reports(&mut self) -> usize {
        let mut shown = 0;
        for outcome in self.desk.drain() {
            if self.reports.complete(outcome.ticket, outcome.text) {
                log::debug!("Report {} displayed", outcome.ticket.0);
                shown += 1;
            } else {
                log::debug!("Report {} superseded, discarded", outcome.ticket.0);
            }
        }
        shown
    }

    pub fn report_text(&self) -> Option<&str> {
        self.reports.text()
    }

    pub fn is_analyzing(&self) -> bool {
        self.reports.is_analyzing()
    }

    pub fn dismiss_report(&mut self) {
        self.reports.dismiss();
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> &EnvironmentState {
        &self.state
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Scaled seconds since start
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Set time scale (1.0 = real-time, 0.0 = paused)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }
}

impl Default for TwinEngine {
    fn default() -> Self {
        Self::new(TwinConfig::default())
    }
}
