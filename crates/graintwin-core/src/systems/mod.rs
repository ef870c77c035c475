//! Systems - logic that advances the twin state

mod recolor;
mod scenario;

pub use recolor::*;
pub use scenario::*;
