//! A shader collaborator that records instead of shading
//!
//! Useful for tests, benchmarks and tools that drive the draw protocol without
//! a GPU.

use pointscope_core::{Matrix4, Point3f, PointVertex, ShaderProgram, Vector3f};

/// Records every call made by a geometry during drawing
#[derive(Debug, Clone, Default)]
pub struct RecordingShader {
    /// Last model-view-projection set
    pub mvp: Option<Matrix4<f32>>,
    /// Every point vertex shaded, in order
    pub points: Vec<PointVertex>,
    /// Number of `draw_points` batches
    pub point_batches: usize,
    pub lines_drawn: usize,
    pub triangles_drawn: usize,
    /// When false only the counters are updated
    pub keep_vertices: bool,
    vertex_count: usize,
}

impl RecordingShader {
    pub fn new() -> Self {
        Self {
            keep_vertices: true,
            ..Default::default()
        }
    }

    /// A recorder that only counts, for long running loops
    pub fn counting() -> Self {
        Self::default()
    }

    /// Number of point vertices shaded since the last [`clear`](Self::clear)
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn clear(&mut self) {
        let keep_vertices = self.keep_vertices;
        *self = Self {
            keep_vertices,
            ..Default::default()
        };
    }
}

impl ShaderProgram for RecordingShader {
    fn set_model_view_projection(&mut self, mvp: &Matrix4<f32>) {
        self.mvp = Some(*mvp);
    }

    fn draw_points(&mut self, vertices: &[PointVertex]) {
        self.point_batches += 1;
        self.vertex_count += vertices.len();
        if self.keep_vertices {
            self.points.extend_from_slice(vertices);
        }
    }

    fn draw_lines(&mut self, _positions: &[Point3f], edges: &[[u32; 2]]) {
        self.lines_drawn += edges.len();
    }

    fn draw_triangles(&mut self, _positions: &[Point3f], _normals: &[Vector3f], faces: &[[u32; 3]]) {
        self.triangles_drawn += faces.len();
    }
}
