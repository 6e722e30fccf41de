//! File sources for pointscope geometries
//!
//! Readers decode to double precision world coordinates so the geometry can
//! pick its own offset before narrowing. Point readers stream records through
//! a [`PointSampler`], so at most [`PointBudget::max_points`] are ever held.
//! Format detection looks at magic bytes first and falls back to the file
//! extension.

pub mod format;
pub mod ply;
pub mod xyz;
pub mod lidar;
pub mod obj;
pub mod sample;

pub use format::*;
pub use sample::{finite_point, PointBudget, PointSampler};

use log::debug;
use pointscope_core::{Error, Point3d, ProgressReporter, Result, Vector3f};
use std::path::Path;

/// Point records read from a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointData {
    pub positions: Vec<Point3d>,
    /// Per-point colour in `0.0..=1.0`
    pub colors: Option<Vec<[f32; 3]>>,
    /// Per-point intensity normalised to `0.0..=1.0`
    pub intensities: Option<Vec<f32>>,
    /// Records in the source before sampling; zero when not known
    pub source_point_count: usize,
}

impl PointData {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Mesh connectivity read from a source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Point3d>,
    pub normals: Option<Vec<Vector3f>>,
    pub faces: Vec<[u32; 3]>,
    pub edges: Vec<[u32; 2]>,
}

impl MeshData {
    /// Check every index refers to an existing vertex
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len() as u32;
        let bad_face = self.faces.iter().flatten().any(|&i| i >= n);
        let bad_edge = self.edges.iter().flatten().any(|&i| i >= n);
        if bad_face || bad_edge {
            return Err(Error::InvalidData(format!(
                "mesh index out of range for {} vertices",
                n
            )));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(Error::InvalidData("normal count does not match vertex count".to_string()));
            }
        }
        if let Some(i) = self.positions.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::InvalidData(format!("non-finite coordinate at mesh vertex {}", i)));
        }
        Ok(())
    }
}

/// Auto-detect format and read at most `budget.max_points` point records
pub fn read_points<P: AsRef<Path>>(
    path: P,
    budget: &PointBudget,
    progress: &mut ProgressReporter,
) -> Result<PointData> {
    let path = path.as_ref();
    let format = detect_format(path);
    debug!("Reading points from {} as {}", path.display(), format.map_or("unknown", |f| f.name()));
    match format {
        Some(SourceFormat::Ply) => ply::read_points(path, budget, progress),
        Some(SourceFormat::Las) => lidar::read_points(path, budget, progress),
        Some(SourceFormat::Xyz) => xyz::read_points(path, budget, progress),
        Some(SourceFormat::Obj) => {
            let mesh = obj::read_mesh(path, progress)?;
            let mut sampler = PointSampler::new(*budget, false, false, mesh.positions.len());
            for p in mesh.positions {
                sampler.push(p, [1.0; 3], 1.0);
            }
            Ok(sampler.finish())
        }
        None => Err(Error::UnsupportedFormat(format!(
            "Unsupported point cloud source: {}",
            path.display()
        ))),
    }
}

/// Auto-detect format and read a mesh
pub fn read_mesh<P: AsRef<Path>>(path: P, progress: &mut ProgressReporter) -> Result<MeshData> {
    let path = path.as_ref();
    match detect_format(path) {
        Some(SourceFormat::Ply) => ply::read_mesh(path, progress),
        Some(SourceFormat::Obj) => obj::read_mesh(path, progress),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh source: {}",
            path.display()
        ))),
    }
}
