//! The geometry provider contract
//!
//! A [`Geometry`] is one loaded dataset. It owns its vertex storage and
//! exposes the draw, estimate and pick protocol used by the renderer. Consumers
//! share it through [`SharedGeometry`]; reloading replaces the contents while
//! every outstanding reference stays valid.

use crate::bounds::Box3d;
use crate::config::GeometryConfig;
use crate::draw_count::DrawCount;
use crate::error::{Error, Result};
use crate::incremental::IncrementalDrawState;
use crate::offset::{local_rounding_error, OffsetPolicy};
use crate::pick::PickResult;
use crate::point::{Point3d, Vector3d};
use crate::progress::ProgressReporter;
use crate::shader::ShaderProgram;
use crate::transform::TransformState;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Spatial metadata common to every geometry
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryMeta {
    file_name: String,
    offset: Vector3d,
    centroid: Point3d,
    bbox: Box3d,
    generation: u64,
}

impl GeometryMeta {
    pub fn new() -> Self {
        Self {
            file_name: String::new(),
            offset: Vector3d::zeros(),
            centroid: Point3d::origin(),
            bbox: Box3d::empty(),
            generation: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn offset(&self) -> &Vector3d {
        &self.offset
    }

    pub fn centroid(&self) -> &Point3d {
        &self.centroid
    }

    pub fn bounding_box(&self) -> &Box3d {
        &self.bbox
    }

    /// Counter bumped by every load, used to invalidate draw cursors
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_string();
    }

    /// Start a new load: bump the generation and drop the spatial state
    pub fn begin_load(&mut self) {
        self.generation += 1;
        self.offset = Vector3d::zeros();
        self.centroid = Point3d::origin();
        self.bbox = Box3d::empty();
    }

    /// Derive offset, centroid and bounding box from resident world positions.
    ///
    /// The box is padded by the worst case `f32` rounding of the local
    /// coordinates so it also contains the positions as stored.
    pub fn update_from_points(&mut self, points: &[Point3d], policy: OffsetPolicy, quantum: f64) {
        let bbox = Box3d::from_points(points);
        let offset = policy.choose(&bbox, points.first(), quantum);
        let centroid = if points.is_empty() {
            Point3d::origin()
        } else {
            let sum = points
                .iter()
                .fold(Vector3d::zeros(), |acc, p| acc + p.coords);
            Point3d::from(sum / points.len() as f64)
        };
        let margin = 2.0 * local_rounding_error(&bbox, &offset);
        self.offset = offset;
        self.centroid = centroid;
        self.bbox = bbox.padded(margin);
    }
}

impl Default for GeometryMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared interface for all geometry types
pub trait Geometry: Send + Sync {
    fn meta(&self) -> &GeometryMeta;

    fn config(&self) -> &GeometryConfig;

    //--------------------------------------------------
    /// Load geometry from file.
    ///
    /// No more than `max_vertex_count` vertices are kept resident; larger
    /// sources are simplified. On error the geometry is left empty, with
    /// offset and bounding box reset to match.
    fn load_file(
        &mut self,
        file_name: &str,
        max_vertex_count: usize,
        progress: &mut ProgressReporter,
    ) -> Result<()>;

    /// Reload geometry from the file it was last loaded from.
    ///
    /// The default implementation calls [`Geometry::load_file`] with the stored name.
    fn reload_file(&mut self, max_vertex_count: usize, progress: &mut ProgressReporter) -> Result<()> {
        let file_name = self.file_name().to_string();
        if file_name.is_empty() {
            progress.finish(false);
            return Err(Error::Load("geometry has never been loaded".to_string()));
        }
        self.load_file(&file_name, max_vertex_count, progress)
    }

    //--------------------------------------------------
    /// Draw points using an already-bound shader.
    ///
    /// `incremental` continues the pass recorded in `state`; it must be used
    /// with the transform that started the pass, otherwise the pass restarts.
    /// Returns an estimate of the geometry shaded and whether more remains.
    fn draw_points(
        &self,
        _shader: &mut dyn ShaderProgram,
        _transform: &TransformState,
        _quality: f64,
        _incremental: bool,
        _state: &mut IncrementalDrawState,
    ) -> DrawCount {
        DrawCount::default()
    }

    /// Draw edges with the given shader
    fn draw_edges(&self, _shader: &mut dyn ShaderProgram, _transform: &TransformState) {}

    /// Draw faces with the given shader
    fn draw_faces(&self, _shader: &mut dyn ShaderProgram, _transform: &TransformState) {}

    /// Total number of resident vertices
    fn point_count(&self) -> usize;

    /// Predict the [`DrawCount`] of `draw_points` at each of `qualities`
    /// without drawing or touching `state`.
    fn estimate_cost(
        &self,
        transform: &TransformState,
        incremental: bool,
        qualities: &[f64],
        state: &IncrementalDrawState,
    ) -> Vec<DrawCount>;

    /// Pick the vertex or surface point closest to what a click along the
    /// ray meant. The along-ray part of the error is scaled by
    /// `longitudinal_scale`. A mesh surface hit reports its scaled depth, so
    /// distances from different geometries compare directly.
    fn pick_vertex(
        &self,
        ray_origin: &Point3d,
        ray_direction: &Vector3d,
        longitudinal_scale: f64,
    ) -> Option<PickResult>;

    //--------------------------------------------------
    /// File name describing the source of the geometry
    fn file_name(&self) -> &str {
        self.meta().file_name()
    }

    /// Offset of the geometry coordinate system
    fn offset(&self) -> &Vector3d {
        self.meta().offset()
    }

    /// Centre of mass in world coordinates
    fn centroid(&self) -> &Point3d {
        self.meta().centroid()
    }

    /// Axis aligned box containing every resident vertex
    fn bounding_box(&self) -> &Box3d {
        self.meta().bounding_box()
    }

    fn generation(&self) -> u64 {
        self.meta().generation()
    }
}

/// Shared handle; the geometry is dropped with its last reference
pub type SharedGeometry = Arc<RwLock<dyn Geometry>>;

/// Wrap a geometry for shared ownership
pub fn share<G: Geometry + 'static>(geometry: G) -> SharedGeometry {
    Arc::new(RwLock::new(geometry))
}

/// Read access that survives a panicked writer
pub fn read_geometry(geometry: &SharedGeometry) -> RwLockReadGuard<'_, dyn Geometry + 'static> {
    geometry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write access that survives a panicked writer
pub fn write_geometry(geometry: &SharedGeometry) -> RwLockWriteGuard<'_, dyn Geometry + 'static> {
    geometry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_meta_from_points() {
        let points = vec![
            Point3d::new(1000.0, 2000.0, 0.0),
            Point3d::new(1002.0, 2000.0, 0.0),
            Point3d::new(1001.0, 2003.0, 6.0),
        ];
        let mut meta = GeometryMeta::new();
        meta.begin_load();
        meta.update_from_points(&points, OffsetPolicy::BoundsCenter, 1.0);

        assert_eq!(meta.generation(), 1);
        assert_eq!(*meta.offset(), Vector3d::new(1001.0, 2002.0, 3.0));
        assert_relative_eq!(*meta.centroid(), Point3d::new(1001.0, 2001.0, 2.0));
        for p in &points {
            assert!(meta.bounding_box().contains(p, 0.0));
        }
    }

    #[test]
    fn test_begin_load_resets_spatial_state() {
        let mut meta = GeometryMeta::new();
        meta.set_file_name("cloud.ply");
        meta.update_from_points(&[Point3d::new(5.0, 5.0, 5.0)], OffsetPolicy::FirstPoint, 1.0);
        meta.begin_load();
        assert!(meta.bounding_box().is_empty());
        assert_eq!(*meta.offset(), Vector3d::zeros());
        assert_eq!(meta.file_name(), "cloud.ply");
    }
}
