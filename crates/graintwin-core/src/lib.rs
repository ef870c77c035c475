//! GrainTwin Core - Silo Digital Twin Engine
//!
//! Drives the pure model in `graintwin-logic`: generates the grain particle
//! volume, advances the simulated sensor readings once per tick, recolors
//! every particle once per frame, and hands report requests to an external
//! text-generation service without blocking either loop.
//!
//! # Architecture
//!
//! - **Generation**: one-off procedural creation of the particle field
//! - **Systems**: the scenario stepper (tick) and the recolor pass (frame)
//! - **Engine**: owns all state and paces the two drivers
//! - **Report**: the external service seam and its worker-thread desk
//!
//! # Example
//!
//! ```rust,no_run
//! use graintwin_core::prelude::*;
//!
//! let mut engine = TwinEngine::new(TwinConfig::default());
//! engine.set_scenario(ScenarioMode::HeatSpike);
//!
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//!     engine.render_frame();
//! }
//! ```

pub mod config;
pub mod engine;
pub mod generation;
pub mod report;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::TwinEngine;
    pub use crate::generation::ParticleField;
    pub use graintwin_logic::config::TwinConfig;
    pub use graintwin_logic::environment::{EnvironmentState, PestPosition, ScenarioMode};
    pub use graintwin_logic::history::{HistoryBuffer, HistoryPoint};
}
