//! Interface to the shading collaborator
//!
//! Geometries never compile, link or bind shaders. They receive a program that
//! the caller has already bound with its uniforms set, and hand it the
//! offset-relative model-view-projection plus vertex batches.

use crate::point::{Point3f, PointVertex, Vector3f};
use nalgebra::Matrix4;

/// An already-bound shading program
pub trait ShaderProgram {
    /// Set the transform for vertices stored relative to the geometry offset
    fn set_model_view_projection(&mut self, mvp: &Matrix4<f32>);

    /// Shade a batch of point vertices
    fn draw_points(&mut self, vertices: &[PointVertex]);

    /// Shade line segments given as index pairs into `positions`
    fn draw_lines(&mut self, _positions: &[Point3f], _edges: &[[u32; 2]]) {}

    /// Shade triangles given as index triples into `positions`
    fn draw_triangles(&mut self, _positions: &[Point3f], _normals: &[Vector3f], _faces: &[[u32; 3]]) {}
}
