use std::{fs, path::Path};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::CameraLens;

/// Tunables for the viewer. Every field falls back to its default when the
/// JSON omits it, so an empty object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub fov_degrees: f32,
    /// Viewport width over height.
    pub aspect: f32,
    pub near_clip: f32,
    pub animate: bool,
    /// Euler degrees used for steps with neither a rotation nor a reference.
    pub default_rotation: [f32; 3],
    pub min_radius: f32,
    pub max_radius: f32,
    /// Degrees per pixel of drag.
    pub rotation_speed: f32,
    pub pinch_zoom_scale: f32,
    /// Frame whole-model bounds instead of each step's sphere.
    pub preview: bool,
    /// Keep step geometry loaded when a model is hidden.
    pub resident_geometry: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near_clip: 0.3,
            animate: true,
            default_rotation: [30.0, 45.0, 0.0],
            min_radius: 0.2,
            max_radius: 30.0,
            rotation_speed: 0.2,
            pinch_zoom_scale: 0.02,
            preview: false,
            resident_geometry: false,
        }
    }
}

impl ViewerConfig {
    pub fn lens(&self) -> CameraLens {
        CameraLens {
            fov_degrees: self.fov_degrees,
            aspect: self.aspect,
            near_clip: self.near_clip,
        }
    }

    pub fn default_rotation(&self) -> Vec3 {
        Vec3::from_array(self.default_rotation)
    }
}

pub fn load_viewer_config(path: &Path) -> Result<ViewerConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading viewer config {}", path.display()))?;
    let config: ViewerConfig = serde_json::from_str(&data)
        .with_context(|| format!("parsing viewer config {}", path.display()))?;
    Ok(config)
}
