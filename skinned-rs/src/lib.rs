//! Headless driver for M3D skinned models.
//!
//! The library side holds the pieces the `skinned-rs` binary is built from:
//! configuration, a frame timer, the first-person camera, the rotating
//! shadow-casting light, the scene tables, the per-frame constant blocks and
//! the [`app::App`] shell that runs the update stages in order.

#![forbid(unsafe_code)]

pub mod app;
pub mod camera;
pub mod cli;
pub mod commands;
pub mod config;
pub mod frame;
pub mod scene;
pub mod shadow;
pub mod timer;
pub mod utils;

pub use app::{App, AppState};
pub use config::AppConfig;
