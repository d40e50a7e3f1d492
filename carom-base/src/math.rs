//! Mathematical vocabulary for 2D positions, motions, and regions.

mod aab;
pub use aab::Aab;

mod coord;
pub use coord::*;

mod grid_aab;
pub use grid_aab::{GridAab, GridAabIter};
