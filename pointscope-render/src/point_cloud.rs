//! Octree backed point cloud provider

use crate::lod::{plan_pass, LodModel};
use crate::octree::{Octree, OctreeParams};
use crate::subsample::{select, subsample_indices};
use log::{debug, info, warn};
use pointscope_core::{
    closest_point_to_ray, to_local, to_world, DrawCount, Error, Geometry, GeometryConfig,
    GeometryMeta, IncrementalDrawState, PickResult, Point3d, PointVertex, ProgressReporter, Ray,
    Result, ShaderProgram, TransformState, Vector3d,
};
use pointscope_io::{PointBudget, PointData};
use rayon::prelude::*;

/// Clouds at least this large are picked with a parallel scan
const PARALLEL_PICK_THRESHOLD: usize = 100_000;

/// A point cloud drawn progressively through a leaf-shuffled octree
#[derive(Debug, Clone, Default)]
pub struct PointCloudGeometry {
    meta: GeometryMeta,
    config: GeometryConfig,
    vertices: Vec<PointVertex>,
    octree: Octree,
    lod: LodModel,
    source_point_count: usize,
}

impl PointCloudGeometry {
    pub fn new() -> Self {
        Self::with_config(GeometryConfig::default())
    }

    pub fn with_config(config: GeometryConfig) -> Self {
        Self {
            lod: LodModel::from_config(&config),
            config,
            ..Default::default()
        }
    }

    /// Resident vertices, ordered leaf by leaf
    pub fn vertices(&self) -> &[PointVertex] {
        &self.vertices
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Number of points in the source before subsampling
    pub fn source_point_count(&self) -> usize {
        self.source_point_count
    }

    /// Resident vertices in leaves that survive culling for `transform`
    pub fn visible_point_count(&self, transform: &TransformState) -> usize {
        let leaves = self.octree.leaves();
        self.octree
            .visible_leaves(&transform.frustum())
            .into_iter()
            .map(|i| leaves[i].len())
            .sum()
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.octree = Octree::default();
        self.source_point_count = 0;
    }

    /// Replace the contents with already decoded points.
    ///
    /// `source_name` becomes the file name used by a later reload.
    pub fn load_data(
        &mut self,
        source_name: &str,
        data: PointData,
        max_vertex_count: usize,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        self.meta.set_file_name(source_name);
        self.meta.begin_load();
        self.clear();
        let result = self.populate(data, max_vertex_count, progress);
        if result.is_err() {
            self.clear();
            self.meta.begin_load();
        }
        progress.finish(result.is_ok());
        result
    }

    fn populate(&mut self, data: PointData, max_vertex_count: usize, progress: &mut ProgressReporter) -> Result<()> {
        if data.is_empty() && data.source_point_count == 0 {
            return Err(Error::Load(format!("{} contains no points", self.meta.file_name())));
        }
        if data.colors.as_ref().is_some_and(|c| c.len() != data.len())
            || data.intensities.as_ref().is_some_and(|i| i.len() != data.len())
        {
            return Err(Error::InvalidData("point attribute count mismatch".to_string()));
        }
        if let Some(p) = data.positions.iter().find(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::InvalidData(format!("non-finite point {:?}", p.coords.as_slice())));
        }
        // Readers that sampled while streaming report the size of the whole source
        self.source_point_count = data.source_point_count.max(data.len());

        let PointData {
            mut positions,
            mut colors,
            mut intensities,
            ..
        } = data;
        if let Some(keep) = subsample_indices(positions.len(), max_vertex_count, self.config.subsample_seed) {
            warn!(
                "Subsampling {} from {} to {} points",
                self.meta.file_name(),
                positions.len(),
                keep.len()
            );
            positions = select(&positions, &keep);
            colors = colors.map(|c| select(&c, &keep));
            intensities = intensities.map(|i| select(&i, &keep));
        }

        self.meta
            .update_from_points(&positions, self.config.offset_policy, self.config.offset_quantum);
        let offset = *self.meta.offset();

        progress.step("Building octree");
        let vertices: Vec<PointVertex> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut v = PointVertex::new(to_local(p, &offset));
                if let Some(c) = colors.as_ref() {
                    v = v.with_color(c[i]);
                }
                if let Some(intensity) = intensities.as_ref() {
                    v = v.with_intensity(intensity[i]);
                }
                v
            })
            .collect();
        progress.percent(25.0);

        // Partition what is actually stored, so culling bounds the f32 positions
        let stored: Vec<Point3d> = vertices.iter().map(|v| to_world(&v.local(), &offset)).collect();
        let (octree, order) = Octree::build(
            &stored,
            OctreeParams {
                leaf_point_count: self.config.leaf_point_count,
                max_depth: self.config.max_octree_depth,
                seed: self.config.subsample_seed,
            },
        );
        progress.percent(75.0);

        self.vertices = order.into_iter().map(|i| vertices[i]).collect();
        self.octree = octree;
        progress.percent(100.0);

        info!(
            "Loaded {}: {} of {} points resident, {} octree leaves, offset {:?}",
            self.meta.file_name(),
            self.vertices.len(),
            self.source_point_count,
            self.octree.leaves().len(),
            offset
        );
        Ok(())
    }
}

impl Geometry for PointCloudGeometry {
    fn meta(&self) -> &GeometryMeta {
        &self.meta
    }

    fn config(&self) -> &GeometryConfig {
        &self.config
    }

    fn load_file(
        &mut self,
        file_name: &str,
        max_vertex_count: usize,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        info!("Loading point cloud {}", file_name);
        let budget = PointBudget::new(max_vertex_count, self.config.subsample_seed);
        match pointscope_io::read_points(file_name, &budget, progress) {
            Ok(data) => self.load_data(file_name, data, max_vertex_count, progress),
            Err(e) => {
                warn!("Failed to read {}: {}", file_name, e);
                self.meta.set_file_name(file_name);
                self.meta.begin_load();
                self.clear();
                progress.finish(false);
                Err(e)
            }
        }
    }

    fn draw_points(
        &self,
        shader: &mut dyn ShaderProgram,
        transform: &TransformState,
        quality: f64,
        incremental: bool,
        state: &mut IncrementalDrawState,
    ) -> DrawCount {
        if self.vertices.is_empty() {
            state.reset();
            return DrawCount::default();
        }

        let generation = self.meta.generation();
        let plan = plan_pass(&self.octree, &self.lod, transform, quality, incremental, state, generation);
        if !plan.continues_pass {
            if incremental {
                debug!("Restarting incremental pass for {}", self.meta.file_name());
            }
            let starts = self.octree.leaves().iter().map(|leaf| leaf.range.start);
            state.begin_pass(transform, generation, starts);
        }

        shader.set_model_view_projection(&transform.offset_model_view_projection(self.meta.offset()));
        for batch in &plan.batches {
            shader.draw_points(&self.vertices[batch.range.clone()]);
            state.advance(batch.leaf, batch.range.len());
        }
        state.finish_call(plan.count.more_to_draw);
        log::trace!(
            target: "pointscope",
            "drew {} points in {} batches, more: {}",
            plan.count.num_vertices,
            plan.batches.len(),
            plan.count.more_to_draw
        );
        plan.count
    }

    fn point_count(&self) -> usize {
        self.vertices.len()
    }

    fn estimate_cost(
        &self,
        transform: &TransformState,
        incremental: bool,
        qualities: &[f64],
        state: &IncrementalDrawState,
    ) -> Vec<DrawCount> {
        let generation = self.meta.generation();
        qualities
            .iter()
            .map(|&q| plan_pass(&self.octree, &self.lod, transform, q, incremental, state, generation).count)
            .collect()
    }

    fn pick_vertex(
        &self,
        ray_origin: &Point3d,
        ray_direction: &Vector3d,
        longitudinal_scale: f64,
    ) -> Option<PickResult> {
        let ray = Ray::new(*ray_origin, *ray_direction)?;
        let offset = *self.meta.offset();
        let world = |v: &PointVertex| to_world(&v.local(), &offset);

        let best = if self.vertices.len() >= PARALLEL_PICK_THRESHOLD {
            self.vertices
                .par_iter()
                .enumerate()
                .map(|(i, v)| (i, ray.weighted_distance(&world(v), longitudinal_scale)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
        } else {
            closest_point_to_ray(self.vertices.iter().map(world), &ray, longitudinal_scale)
        };

        best.map(|(i, distance)| PickResult {
            position: world(&self.vertices[i]),
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingShader;
    use approx::assert_relative_eq;

    fn cloud(points: Vec<Point3d>, leaf_point_count: usize) -> PointCloudGeometry {
        let mut geom = PointCloudGeometry::with_config(GeometryConfig {
            leaf_point_count,
            ..Default::default()
        });
        let data = PointData {
            positions: points,
            ..Default::default()
        };
        geom.load_data("memory", data, usize::MAX, &mut ProgressReporter::silent())
            .unwrap();
        geom
    }

    fn plane(n: usize, origin: Point3d) -> Vec<Point3d> {
        (0..n * n)
            .map(|i| origin + Vector3d::new((i % n) as f64, (i / n) as f64, 0.0))
            .collect()
    }

    fn top_down(target: Point3d, height: f64) -> TransformState {
        TransformState::look_at(
            target + Vector3d::new(0.0, 0.0, height),
            target,
            Vector3d::y(),
            std::f64::consts::FRAC_PI_4,
            [800, 600],
            0.1,
            10_000.0,
        )
    }

    #[test]
    fn test_unloaded_geometry_is_inert() {
        let geom = PointCloudGeometry::new();
        let mut shader = RecordingShader::new();
        let mut state = IncrementalDrawState::new();
        let t = TransformState::default();
        assert!(geom.draw_points(&mut shader, &t, 1.0, false, &mut state).is_empty());
        assert_eq!(shader.point_batches, 0);
        assert_eq!(
            geom.estimate_cost(&t, false, &[1.0], &state),
            vec![DrawCount::default()]
        );
        assert!(geom
            .pick_vertex(&Point3d::origin(), &Vector3d::new(0.0, 0.0, -1.0), 1.0)
            .is_none());
    }

    #[test]
    fn test_georeferenced_points_keep_precision() {
        let origin = Point3d::new(600_000.0, 5_000_000.0, 100.0);
        let geom = cloud(plane(30, origin), 64);
        assert_eq!(geom.point_count(), 900);
        assert_relative_eq!(geom.offset().x, 600_015.0);

        let p = geom.vertices()[0];
        let world = to_world(&p.local(), geom.offset());
        assert_relative_eq!(world.x, world.x.round());
        assert_relative_eq!(world.y, world.y.round());
    }

    #[test]
    fn test_draw_uses_offset_relative_transform() {
        let origin = Point3d::new(600_000.0, 5_000_000.0, 100.0);
        let geom = cloud(plane(10, origin), 64);
        let t = top_down(origin, 50.0);
        let mut shader = RecordingShader::new();
        let mut state = IncrementalDrawState::new();
        geom.draw_points(&mut shader, &t, 1.0, false, &mut state);
        assert_eq!(shader.mvp, Some(t.offset_model_view_projection(geom.offset())));
    }

    #[test]
    fn test_estimate_matches_draw() {
        let geom = cloud(plane(60, Point3d::origin()), 100);
        let t = top_down(Point3d::new(30.0, 30.0, 0.0), 400.0);
        let state = IncrementalDrawState::new();
        for q in [0.05, 0.3, 1.0] {
            let estimate = geom.estimate_cost(&t, false, &[q], &state)[0];
            let mut shader = RecordingShader::counting();
            let mut draw_state = IncrementalDrawState::new();
            let drawn = geom.draw_points(&mut shader, &t, q, false, &mut draw_state);
            assert_eq!(estimate, drawn);
            assert_eq!(shader.vertex_count() as f64, drawn.num_vertices);
        }
    }

    #[test]
    fn test_pick_nearest_under_cursor() {
        let geom = cloud(plane(20, Point3d::origin()), 50);
        let dir = Vector3d::new(0.0, 0.0, -1.0);
        let hit = geom
            .pick_vertex(&Point3d::new(7.2, 3.9, 10.0), &dir, 0.0)
            .unwrap();
        assert_eq!(hit.position, Point3d::new(7.0, 4.0, 0.0));
        assert!(hit.distance < 0.3);
    }

    #[test]
    fn test_attributes_follow_their_points() {
        let positions: Vec<Point3d> = (0..50).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect();
        let data = PointData {
            colors: Some(positions.iter().map(|p| [p.x as f32 / 50.0, 0.5, 0.0]).collect()),
            intensities: Some(positions.iter().map(|p| p.x as f32 / 100.0).collect()),
            positions,
            ..Default::default()
        };
        let mut geom = PointCloudGeometry::with_config(GeometryConfig {
            leaf_point_count: 8,
            ..Default::default()
        });
        geom.load_data("memory", data, usize::MAX, &mut ProgressReporter::silent())
            .unwrap();
        for v in geom.vertices() {
            let x = to_world(&v.local(), geom.offset()).x as f32;
            assert_relative_eq!(v.color[0], x / 50.0, epsilon = 1e-6);
            assert_relative_eq!(v.color[1], 0.5);
            assert_relative_eq!(v.intensity, x / 100.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let mut geom = PointCloudGeometry::new();
        let data = PointData {
            positions: vec![Point3d::new(1.0, 2.0, 3.0), Point3d::new(f64::INFINITY, 0.0, 0.0)],
            ..Default::default()
        };
        let result = geom.load_data("memory", data, usize::MAX, &mut ProgressReporter::silent());
        assert!(matches!(result, Err(Error::InvalidData(_))));
        assert_eq!(geom.point_count(), 0);
        assert!(geom.bounding_box().is_empty());
    }

    #[test]
    fn test_file_sampled_while_reading() {
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("pointscope_stream_{}.xyz", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..20_000 {
            writeln!(file, "{} {} 0", i % 100, i / 100).unwrap();
        }
        drop(file);

        let mut geom = PointCloudGeometry::new();
        geom.load_file(path.to_str().unwrap(), 500, &mut ProgressReporter::silent())
            .unwrap();
        assert_eq!(geom.point_count(), 500);
        assert_eq!(geom.source_point_count(), 20_000);
        let _ = std::fs::remove_file(&path);
    }
}
