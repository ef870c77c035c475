//! Pure model for the GrainTwin silo digital twin.
//!
//! This crate contains everything about the silo that can be computed from
//! plain data: sensor readings, scenario modes, the two scalar fields that
//! drive the particle colors, the history log, configuration and the
//! textual report prompt. Nothing here owns a clock, an RNG or a thread;
//! the engine in `graintwin-core` drives it.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`color`] | RGB triples, linear blending, the grain palette |
//! | [`config`] | Silo geometry, scenario tuning, report settings, validation |
//! | [`environment`] | Sensor readings, pest position, scenario modes |
//! | [`field`] | Temperature-by-height and humidity-leak fields, per-particle shading |
//! | [`geometry`] | Minimal 3D vector used for particle positions |
//! | [`history`] | Fixed-capacity FIFO of past readings for charting |
//! | [`report`] | Report prompt rendering and the sequence-guarded report board |
//! | [`status`] | Alert thresholds and operator-facing status labels |

pub mod color;
pub mod config;
pub mod environment;
pub mod field;
pub mod geometry;
pub mod history;
pub mod report;
pub mod status;
