//! Triangle mesh provider
//!
//! Meshes are small enough to draw in one call, so there is no level of
//! detail: a fresh draw shades every vertex and an incremental continuation of
//! the same view has nothing left to do.

use crate::subsample::{remap_primitives, remap_table, select, subsample_indices};
use log::{info, warn};
use pointscope_core::{
    closest_point_to_ray, to_local, to_world, DrawCount, Error, Geometry, GeometryConfig,
    GeometryMeta, IncrementalDrawState, PickResult, Point3d, Point3f, PointVertex,
    ProgressReporter, Ray, Result, ShaderProgram, TransformState, Vector3d, Vector3f,
};
use pointscope_io::MeshData;

/// A triangle mesh with optional polyline edges
#[derive(Debug, Clone, Default)]
pub struct TriMeshGeometry {
    meta: GeometryMeta,
    config: GeometryConfig,
    positions: Vec<Point3f>,
    normals: Vec<Vector3f>,
    faces: Vec<[u32; 3]>,
    edges: Vec<[u32; 2]>,
    vertices: Vec<PointVertex>,
}

impl TriMeshGeometry {
    pub fn new() -> Self {
        Self::with_config(GeometryConfig::default())
    }

    pub fn with_config(config: GeometryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Offset-relative vertex positions
    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    /// Unit vertex normals, one per position
    pub fn normals(&self) -> &[Vector3f] {
        &self.normals
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Explicit polylines followed by the unique triangle edges
    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.faces.clear();
        self.edges.clear();
        self.vertices.clear();
    }

    /// Replace the contents with an already decoded mesh
    pub fn load_data(
        &mut self,
        source_name: &str,
        mesh: MeshData,
        max_vertex_count: usize,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        self.meta.set_file_name(source_name);
        self.meta.begin_load();
        self.clear();
        let result = self.populate(mesh, max_vertex_count, progress);
        if result.is_err() {
            self.clear();
            self.meta.begin_load();
        }
        progress.finish(result.is_ok());
        result
    }

    fn populate(&mut self, mesh: MeshData, max_vertex_count: usize, progress: &mut ProgressReporter) -> Result<()> {
        mesh.validate()?;
        if mesh.positions.is_empty() {
            return Err(Error::Load(format!("{} contains no vertices", self.meta.file_name())));
        }
        let source_vertices = mesh.positions.len();
        let MeshData {
            mut positions,
            mut normals,
            mut faces,
            mut edges,
        } = mesh;

        if let Some(keep) = subsample_indices(positions.len(), max_vertex_count, self.config.subsample_seed) {
            let table = remap_table(positions.len(), &keep);
            let face_count = faces.len();
            positions = select(&positions, &keep);
            normals = normals.map(|n| select(&n, &keep));
            faces = remap_primitives(&faces, &table);
            edges = remap_primitives(&edges, &table);
            warn!(
                "Degrading mesh {} from {} to {} vertices; {} of {} faces survive",
                self.meta.file_name(),
                source_vertices,
                positions.len(),
                faces.len(),
                face_count
            );
        }

        progress.step("Preparing mesh");
        self.meta
            .update_from_points(&positions, self.config.offset_policy, self.config.offset_quantum);
        let offset = *self.meta.offset();
        self.positions = positions.iter().map(|p| to_local(p, &offset)).collect();
        progress.percent(30.0);

        self.normals = match normals {
            Some(n) => n.iter().map(|v| v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros)).collect(),
            None => vertex_normals(&self.positions, &faces),
        };
        progress.percent(60.0);

        edges.extend(triangle_edges(&faces));
        self.edges = edges;
        self.faces = faces;
        self.vertices = self.positions.iter().map(|p| PointVertex::new(*p)).collect();
        progress.percent(100.0);

        info!(
            "Loaded mesh {}: {} vertices, {} faces, {} edges",
            self.meta.file_name(),
            self.positions.len(),
            self.faces.len(),
            self.edges.len()
        );
        Ok(())
    }

    fn world(&self, index: u32) -> Point3d {
        to_world(&self.positions[index as usize], self.meta.offset())
    }

    fn is_visible(&self, transform: &TransformState) -> bool {
        transform.frustum().intersects_box(self.meta.bounding_box())
    }
}

/// Area weighted vertex normals
pub fn vertex_normals(positions: &[Point3f], faces: &[[u32; 3]]) -> Vec<Vector3f> {
    let mut normals = vec![Vector3f::zeros(); positions.len()];
    for &[a, b, c] in faces {
        let (pa, pb, pc) = (positions[a as usize], positions[b as usize], positions[c as usize]);
        // Cross product length is twice the triangle area
        let n = (pb - pa).cross(&(pc - pa));
        for i in [a, b, c] {
            normals[i as usize] += n;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros))
        .collect()
}

/// Each undirected triangle edge once, as `[low, high]`
pub fn triangle_edges(faces: &[[u32; 3]]) -> Vec<[u32; 2]> {
    let mut edges: Vec<[u32; 2]> = faces
        .iter()
        .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
        .filter(|e| e[0] != e[1])
        .map(|[a, b]| [a.min(b), a.max(b)])
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

impl Geometry for TriMeshGeometry {
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
        info!("Loading mesh {}", file_name);
        match pointscope_io::read_mesh(file_name, progress) {
            Ok(mesh) => self.load_data(file_name, mesh, max_vertex_count, progress),
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
        _quality: f64,
        incremental: bool,
        state: &mut IncrementalDrawState,
    ) -> DrawCount {
        if self.vertices.is_empty() {
            state.reset();
            return DrawCount::default();
        }
        let generation = self.meta.generation();
        if incremental && state.is_valid_for(transform, generation) {
            return DrawCount::default();
        }
        state.begin_pass(transform, generation, std::iter::empty::<usize>());
        state.finish_call(false);
        if !self.is_visible(transform) {
            return DrawCount::default();
        }
        shader.set_model_view_projection(&transform.offset_model_view_projection(self.meta.offset()));
        shader.draw_points(&self.vertices);
        DrawCount::complete(self.vertices.len())
    }

    fn draw_edges(&self, shader: &mut dyn ShaderProgram, transform: &TransformState) {
        if self.edges.is_empty() || !self.is_visible(transform) {
            return;
        }
        shader.set_model_view_projection(&transform.offset_model_view_projection(self.meta.offset()));
        shader.draw_lines(&self.positions, &self.edges);
    }

    fn draw_faces(&self, shader: &mut dyn ShaderProgram, transform: &TransformState) {
        if self.faces.is_empty() || !self.is_visible(transform) {
            return;
        }
        shader.set_model_view_projection(&transform.offset_model_view_projection(self.meta.offset()));
        shader.draw_triangles(&self.positions, &self.normals, &self.faces);
    }

    fn point_count(&self) -> usize {
        self.positions.len()
    }

    fn estimate_cost(
        &self,
        transform: &TransformState,
        incremental: bool,
        qualities: &[f64],
        state: &IncrementalDrawState,
    ) -> Vec<DrawCount> {
        let continues = incremental && state.is_valid_for(transform, self.meta.generation());
        let count = if self.vertices.is_empty() || continues || !self.is_visible(transform) {
            DrawCount::default()
        } else {
            DrawCount::complete(self.vertices.len())
        };
        vec![count; qualities.len()]
    }

    fn pick_vertex(
        &self,
        ray_origin: &Point3d,
        ray_direction: &Vector3d,
        longitudinal_scale: f64,
    ) -> Option<PickResult> {
        let ray = Ray::new(*ray_origin, *ray_direction)?;

        let nearest_hit = self
            .faces
            .iter()
            .filter_map(|&[a, b, c]| ray.intersect_triangle(&self.world(a), &self.world(b), &self.world(c)))
            .min_by(|a, b| a.total_cmp(b));
        if let Some(t) = nearest_hit {
            // The hit lies on the ray, so this is |longitudinal_scale * t|
            let position = ray.at(t);
            return Some(PickResult {
                position,
                distance: ray.weighted_distance(&position, longitudinal_scale),
            });
        }

        // Nothing hit: fall back to the vertex closest to the ray
        let offset = *self.meta.offset();
        closest_point_to_ray(
            self.positions.iter().map(|p| to_world(p, &offset)),
            &ray,
            longitudinal_scale,
        )
        .map(|(i, distance)| PickResult {
            position: to_world(&self.positions[i], &offset),
            distance,
        })
    }
}
