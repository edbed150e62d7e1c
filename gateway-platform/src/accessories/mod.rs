//! Built-in device handlers

pub mod window_covering;

pub use window_covering::{CoveringState, PositionState, WindowCovering, WindowCoveringFactory};
