//! Geometry loading and level of detail configuration

use crate::error::{Error, Result};
use crate::offset::OffsetPolicy;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deepest octree a configuration may ask for. Cells this deep are far below
/// `f64` resolution for any real extent, and octree builds recurse per level.
pub const MAX_OCTREE_DEPTH: u32 = 48;

/// Tunables shared by the concrete geometry providers.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Maximum number of points in one octree leaf
    pub leaf_point_count: usize,
    pub max_octree_depth: u32,
    /// Camera distance below which a leaf is drawn in full at quality 1
    pub draw_all_distance: f64,
    /// Floor on the camera-to-leaf distance used by the LOD falloff
    pub min_lod_distance: f64,
    pub offset_policy: OffsetPolicy,
    /// Offsets are rounded to a multiple of this; zero disables rounding
    pub offset_quantum: f64,
    /// Seed for subsampling and in-leaf shuffling
    pub subsample_seed: u64,
    /// Minimum percentage between forwarded progress events
    pub progress_step_percent: u8,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            leaf_point_count: 16_384,
            max_octree_depth: 16,
            draw_all_distance: 100.0,
            min_lod_distance: 10.0,
            offset_policy: OffsetPolicy::BoundsCenter,
            offset_quantum: 1.0,
            subsample_seed: 0x5eed_0f_c10d,
            progress_step_percent: 1,
        }
    }
}

impl GeometryConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading geometry config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make the octree or LOD model degenerate
    pub fn validate(&self) -> Result<()> {
        if self.leaf_point_count == 0 {
            return Err(Error::Config("leaf_point_count must be positive".to_string()));
        }
        if self.max_octree_depth > MAX_OCTREE_DEPTH {
            return Err(Error::Config(format!(
                "max_octree_depth {} exceeds {}",
                self.max_octree_depth, MAX_OCTREE_DEPTH
            )));
        }
        if !(self.draw_all_distance > 0.0) {
            return Err(Error::Config("draw_all_distance must be positive".to_string()));
        }
        if !(self.min_lod_distance > 0.0) {
            return Err(Error::Config("min_lod_distance must be positive".to_string()));
        }
        if self.offset_quantum < 0.0 {
            return Err(Error::Config("offset_quantum must not be negative".to_string()));
        }
        Ok(())
    }
}
