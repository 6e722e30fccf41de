//! Point and vector types
//!
//! World coordinates are always double precision. Vertex storage uses single
//! precision relative to a per-geometry offset, see [`crate::offset`].

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with single precision coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with single precision components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A vertex as handed to the shading collaborator.
///
/// `position` is relative to the owning geometry's offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

impl PointVertex {
    /// Create a vertex from a local position with default color and intensity
    pub fn new(position: Point3f) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Local position as a point
    pub fn local(&self) -> Point3f {
        Point3f::new(self.position[0], self.position[1], self.position[2])
    }
}

impl Default for PointVertex {
    fn default() -> Self {
        Self::new(Point3f::origin())
    }
}
