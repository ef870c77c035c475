//! Grain particle generation

use graintwin_logic::color::{palette, Rgb};
use graintwin_logic::config::SiloGeometry;
use graintwin_logic::geometry::Vec3;
use rand::Rng;

/// Fixed set of sample points filling the grain cylinder.
///
/// Positions never change after generation; colors are rewritten every
/// frame. Both buffers always have the same length.
#[derive(Debug, Clone)]
pub struct ParticleField {
    positions: Vec<Vec3>,
    colors: Vec<Rgb>,
}

impl ParticleField {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Positions read-only, colors writable, for the recolor pass.
    pub fn split_mut(&mut self) -> (&[Vec3], &mut [Rgb]) {
        (&self.positions, &mut self.colors)
    }

    /// Flat `[x, y, z]` buffer for upload to a renderer.
    pub fn position_buffer(&self) -> Vec<[f32; 3]> {
        self.positions.iter().map(|p| p.to_array()).collect()
    }

    /// Flat `[r, g, b, a]` buffer for upload to a renderer.
    pub fn color_buffer(&self, alpha: f32) -> Vec<[f32; 4]> {
        self.colors.iter().map(|c| c.to_rgba(alpha)).collect()
    }
}

/// Scatter `silo.particle_count` points uniformly through the grain cylinder.
///
/// The radius is drawn as `R * sqrt(u)`; drawing it uniformly would crowd
/// points around the axis since area grows with r².
pub fn generate_particles(silo: &SiloGeometry, rng: &mut impl Rng) -> ParticleField {
    let count = silo.particle_count;
    let mut positions = Vec::with_capacity(count);

    for _ in 0..count {
        let r = silo.radius * rng.gen::<f32>().sqrt();
        let theta = rng.gen::<f32>() * std::f32::consts::TAU;
        let y = rng.gen::<f32>() * silo.height;

        positions.push(Vec3::new(r * theta.cos(), y, r * theta.sin()));
    }

    log::info!(
        "Generated {} grain particles (r={}, h={})",
        count,
        silo.radius,
        silo.height
    );

    ParticleField {
        positions,
        colors: vec![palette::GRAIN_GOLD; count],
    }
}
