//! A set of geometries drawn together
//!
//! The scene owns one [`IncrementalDrawState`] per geometry, so a renderer can
//! drive progressive drawing of everything on screen with a single call per
//! frame and combine the results into one [`DrawCount`].

use crate::budget::find_quality_for_budget;
use log::info;
use pointscope_core::{
    read_geometry, write_geometry, Box3d, DrawCount, IncrementalDrawState, PickResult, Point3d,
    ProgressReporter, Result, ShaderProgram, SharedGeometry, TransformState, Vector3d,
};
use std::sync::Arc;

struct SceneEntry {
    geometry: SharedGeometry,
    state: IncrementalDrawState,
}

/// Geometries with their incremental draw cursors
#[derive(Default)]
pub struct Scene {
    entries: Vec<SceneEntry>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a geometry and return its index; adding the same geometry twice
    /// returns the existing index.
    pub fn add(&mut self, geometry: SharedGeometry) -> usize {
        if let Some(index) = self.index_of(&geometry) {
            return index;
        }
        self.entries.push(SceneEntry {
            geometry,
            state: IncrementalDrawState::new(),
        });
        self.entries.len() - 1
    }

    pub fn index_of(&self, geometry: &SharedGeometry) -> Option<usize> {
        self.entries.iter().position(|e| Arc::ptr_eq(&e.geometry, geometry))
    }

    /// Remove a geometry, returning true if it was present
    pub fn remove(&mut self, geometry: &SharedGeometry) -> bool {
        match self.index_of(geometry) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn geometry(&self, index: usize) -> Option<&SharedGeometry> {
        self.entries.get(index).map(|e| &e.geometry)
    }

    pub fn geometries(&self) -> impl Iterator<Item = &SharedGeometry> {
        self.entries.iter().map(|e| &e.geometry)
    }

    pub fn draw_state(&self, index: usize) -> Option<&IncrementalDrawState> {
        self.entries.get(index).map(|e| &e.state)
    }

    /// Draw every geometry's points, summing the counts
    pub fn draw_points(
        &mut self,
        shader: &mut dyn ShaderProgram,
        transform: &TransformState,
        quality: f64,
        incremental: bool,
    ) -> DrawCount {
        let mut total = DrawCount::default();
        for entry in &mut self.entries {
            total += read_geometry(&entry.geometry).draw_points(
                &mut *shader,
                transform,
                quality,
                incremental,
                &mut entry.state,
            );
        }
        total
    }

    pub fn draw_edges(&self, shader: &mut dyn ShaderProgram, transform: &TransformState) {
        for entry in &self.entries {
            read_geometry(&entry.geometry).draw_edges(shader, transform);
        }
    }

    pub fn draw_faces(&self, shader: &mut dyn ShaderProgram, transform: &TransformState) {
        for entry in &self.entries {
            read_geometry(&entry.geometry).draw_faces(shader, transform);
        }
    }

    /// Combined estimate at each quality, without touching any cursor
    pub fn estimate_cost(&self, transform: &TransformState, incremental: bool, qualities: &[f64]) -> Vec<DrawCount> {
        let mut totals = vec![DrawCount::default(); qualities.len()];
        for entry in &self.entries {
            let counts = read_geometry(&entry.geometry).estimate_cost(transform, incremental, qualities, &entry.state);
            for (total, count) in totals.iter_mut().zip(counts) {
                *total += count;
            }
        }
        totals
    }

    /// Highest quality at which the whole scene fits `target_vertices`
    pub fn find_quality(
        &self,
        transform: &TransformState,
        incremental: bool,
        target_vertices: f64,
        iterations: usize,
    ) -> f64 {
        find_quality_for_budget(
            |qualities| self.estimate_cost(transform, incremental, qualities),
            target_vertices,
            iterations,
        )
    }

    /// Nearest pick over all geometries, with the index of the winner
    pub fn pick_vertex(
        &self,
        ray_origin: &Point3d,
        ray_direction: &Vector3d,
        longitudinal_scale: f64,
    ) -> Option<(usize, PickResult)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                read_geometry(&entry.geometry)
                    .pick_vertex(ray_origin, ray_direction, longitudinal_scale)
                    .map(|hit| (i, hit))
            })
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
    }

    /// Reload geometry `index` in place; every outstanding handle sees the new data
    pub fn reload(&mut self, index: usize, max_vertex_count: usize, progress: &mut ProgressReporter) -> Result<()> {
        let entry = self.entries.get_mut(index).ok_or_else(|| {
            pointscope_core::Error::Load(format!("no geometry at scene index {}", index))
        })?;
        entry.state.reset();
        let result = write_geometry(&entry.geometry).reload_file(max_vertex_count, progress);
        info!("Reloaded scene geometry {}: {}", index, if result.is_ok() { "ok" } else { "failed" });
        result
    }

    /// Union of all bounding boxes
    pub fn bounding_box(&self) -> Box3d {
        let mut bbox = Box3d::empty();
        for entry in &self.entries {
            bbox.extend_by_box(read_geometry(&entry.geometry).bounding_box());
        }
        bbox
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|e| read_geometry(&e.geometry).file_name().to_string())
            .collect();
        f.debug_struct("Scene").field("geometries", &names).finish()
    }
}
