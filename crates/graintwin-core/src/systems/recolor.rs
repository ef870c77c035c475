//! Recolor system - rewrites every particle color from the current readings

use graintwin_logic::config::SiloGeometry;
use graintwin_logic::environment::EnvironmentState;
use graintwin_logic::field::{blend, FieldSnapshot};

use crate::generation::ParticleField;

/// Counts gathered during one recolor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecolorStats {
    /// Particles with a non-zero heat blend.
    pub heated: usize,
    /// Particles with a non-zero wetness blend.
    pub wet: usize,
}

/// Recompute all particle colors. Runs once per frame over the full field.
pub fn recolor_particles(
    field: &mut ParticleField,
    state: &EnvironmentState,
    silo: &SiloGeometry,
) -> RecolorStats {
    let fields = FieldSnapshot::new(state, silo);
    let mut stats = RecolorStats::default();

    let (positions, colors) = field.split_mut();
    for (pos, color) in positions.iter().zip(colors.iter_mut()) {
        let (heat, wet) = fields.factors_at(*pos);
        if heat > 0.0 {
            stats.heated += 1;
        }
        if wet > 0.0 {
            stats.wet += 1;
        }
        *color = blend(heat, wet);
    }

    stats
}
