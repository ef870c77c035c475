//! Generation - procedural creation of the grain particle field

mod particles;

pub use particles::*;
