//! Per-render settings.

use serde::{Deserialize, Serialize};

use crate::sampler::{SamplerKind, DEFAULT_PRIME_BOUND};
use crate::{RenderError, RenderResult};

/// Sampling and camera-lens settings of a render.
///
/// Every field has a default so a settings document only needs to name
/// what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Jittered sub-pixel positions per pixel
    pub subpixel_num: u32,
    /// Paths traced per sub-pixel position
    pub sample_num: u32,
    /// Deepest bounce that still scatters; deeper hits return emission only
    pub recursive_depth: u32,
    /// Distance from the lens to the plane in focus
    pub focal_distance: f32,
    /// Lens radius; 0 disables depth of field
    pub lens_radius: f32,
    /// Exposure value, must be negative
    pub exposure: f32,
    /// Sequence used for bounce directions and lens samples
    pub sampler: SamplerKind,
    /// Trace the pixels of each row on the rayon pool
    pub parallel: bool,
    /// Sieve bound of the QMC prime table
    pub prime_bound: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            subpixel_num: 4,
            sample_num: 16,
            recursive_depth: 5,
            focal_distance: 10.0,
            lens_radius: 0.0,
            exposure: -1.0,
            sampler: SamplerKind::default(),
            parallel: true,
            prime_bound: DEFAULT_PRIME_BOUND,
        }
    }
}

impl RenderSettings {
    /// Samples traced per pixel.
    pub fn samples_per_pixel(&self) -> u64 {
        self.subpixel_num as u64 * self.sample_num as u64
    }

    /// Check the settings describe a render that can run.
    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: &str| Err(RenderError::InvalidSettings(msg.to_string()));

        if self.subpixel_num == 0 {
            return invalid("subpixel_num must be at least 1");
        }
        if self.sample_num == 0 {
            return invalid("sample_num must be at least 1");
        }
        if !(self.exposure < 0.0) || !self.exposure.is_finite() {
            return invalid("exposure must be a negative number");
        }
        if !(self.lens_radius >= 0.0) || !self.lens_radius.is_finite() {
            return invalid("lens_radius must be zero or positive");
        }
        if self.lens_radius > 0.0 && !(self.focal_distance.is_finite() && self.focal_distance != 0.0) {
            return invalid("focal_distance must be non-zero when depth of field is enabled");
        }
        Ok(())
    }
}
