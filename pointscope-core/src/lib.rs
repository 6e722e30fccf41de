//! Core data structures and traits for pointscope
//!
//! This crate provides the value types and the contract a geometry provider
//! must satisfy to take part in progressive drawing, cost estimation and
//! picking: draw counts, bounding boxes, coordinate offsets, camera transforms,
//! load progress reporting and the [`Geometry`] trait itself.

pub mod point;
pub mod bounds;
pub mod draw_count;
pub mod offset;
pub mod transform;
pub mod pick;
pub mod progress;
pub mod incremental;
pub mod shader;
pub mod geometry;
pub mod config;
pub mod error;

pub use point::*;
pub use bounds::*;
pub use draw_count::*;
pub use offset::*;
pub use transform::*;
pub use pick::*;
pub use progress::*;
pub use incremental::*;
pub use shader::*;
pub use geometry::*;
pub use config::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};
