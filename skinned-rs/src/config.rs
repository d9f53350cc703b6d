//! Application configuration
//!
//! Settings come from an optional YAML file and are then overridden by
//! command-line arguments. Every field has a default so a partial file is
//! enough.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Runtime settings for the headless driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Skinned model to load
    pub model: PathBuf,
    /// Plain position/normal mesh drawn as the skull
    pub skull: Option<PathBuf>,
    /// Directory texture file names are resolved against
    pub texture_dir: PathBuf,
    /// Clip the skinned instance plays
    pub clip: String,
    /// Number of frames a headless run advances
    pub frames: u32,
    /// Fixed frame step in seconds
    pub time_step: f32,
    /// Client area used for the projection aspect ratio
    pub width: u32,
    pub height: u32,
    /// Shadow map edge length in texels
    pub shadow_map_size: u32,
    /// Radius of the sphere bounding the scene, centred at the origin
    pub scene_radius: f32,
    /// Light direction before rotation
    pub light_direction: Vec3,
    /// Light rotation about +Y in radians per second
    pub light_rotation_speed: f32,
    /// Camera start position
    pub camera_position: Vec3,
    /// Camera walk and strafe speed in units per second
    pub camera_speed: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("Models/soldier.m3d"),
            skull: None,
            texture_dir: PathBuf::from("../Textures"),
            clip: "Take1".to_string(),
            frames: 600,
            time_step: 1.0 / 60.0,
            width: 800,
            height: 600,
            shadow_map_size: 2048,
            scene_radius: (10.0f32 * 10.0 + 15.0 * 15.0).sqrt(),
            light_direction: Vec3::new(0.57735, -0.57735, 0.57735),
            light_rotation_speed: 0.1,
            camera_position: Vec3::new(0.0, 2.0, -15.0),
            camera_speed: 10.0,
        }
    }
}

impl AppConfig {
    /// Read a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the file when one is given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Projection aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Reject values the frame loop cannot run with
    pub fn check(&self) -> Result<()> {
        anyhow::ensure!(
            self.time_step.is_finite() && self.time_step >= 0.0,
            "time_step must be a non-negative number, got {}",
            self.time_step
        );
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "window size must be non-zero, got {}x{}",
            self.width,
            self.height
        );
        anyhow::ensure!(
            self.scene_radius > 0.0,
            "scene_radius must be positive, got {}",
            self.scene_radius
        );
        anyhow::ensure!(
            self.light_direction.length_squared() > 0.0,
            "light_direction must not be zero"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.clip, "Take1");
        assert_eq!(config.shadow_map_size, 2048);
        assert!((config.scene_radius - 18.027_756).abs() < 1e-4);
        assert!((config.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
        config.check().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml(
            "model: Models/soldier.m3d\nclip: Walk\nframes: 10\nlight_direction: [0.0, -1.0, 0.0]\n",
        )
        .unwrap();
        assert_eq!(config.clip, "Walk");
        assert_eq!(config.frames, 10);
        assert_eq!(config.light_direction, Vec3::NEG_Y);
        assert_eq!(config.camera_position, Vec3::new(0.0, 2.0, -15.0));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AppConfig {
            skull: Some(PathBuf::from("Models/skull.txt")),
            ..Default::default()
        };
        let text = config.to_yaml().unwrap();
        assert_eq!(AppConfig::from_yaml(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_negative_step() {
        assert!(AppConfig::from_yaml("time_step: -0.5\n").is_err());
        assert!(AppConfig::from_yaml("width: 0\n").is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skinned.yaml");
        fs::write(&path, "frames: 3\n").unwrap();

        assert_eq!(AppConfig::load(&path).unwrap().frames, 3);
        assert!(AppConfig::load(dir.path().join("missing.yaml")).is_err());
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
    }
}
