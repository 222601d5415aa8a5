//! Render parameter file.

use std::path::{Path, PathBuf};

use lumo_math::{Camera, Vec3};
use lumo_renderer::RenderSettings;
use serde::{Deserialize, Serialize};

/// Contents of `params.json`.
///
/// Scene paths are relative to the directory holding the file. Sampling
/// settings sit at the top level next to the scene keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    pub window_width: u32,
    pub window_height: u32,
    /// OBJ scene
    pub path: PathBuf,
    /// Environment map
    pub environment: PathBuf,
    #[serde(default)]
    pub camera: CameraParams,
    /// Seconds between progress snapshots
    #[serde(default = "default_wait_time")]
    pub wait_time: u64,
    #[serde(flatten)]
    pub settings: RenderSettings,
}

fn default_wait_time() -> u64 {
    10
}

impl Params {
    pub fn scene_path(&self, base: &Path) -> PathBuf {
        base.join(&self.path)
    }

    pub fn environment_path(&self, base: &Path) -> PathBuf {
        base.join(&self.environment)
    }
}

/// Look-at camera description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraParams {
    pub fn to_camera(&self) -> Camera {
        Camera::look_at(
            Vec3::from_array(self.position),
            Vec3::from_array(self.target),
            Vec3::from_array(self.up),
            self.fov_y.to_radians(),
            self.near,
            self.far,
        )
    }
}
