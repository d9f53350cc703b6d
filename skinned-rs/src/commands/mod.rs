//! Command implementations

pub mod model;
pub mod play;
pub mod scene;
