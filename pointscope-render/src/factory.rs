//! Choosing a geometry provider for a source

use crate::mesh::TriMeshGeometry;
use crate::point_cloud::PointCloudGeometry;
use log::debug;
use pointscope_core::{share, GeometryConfig, SharedGeometry};
use pointscope_io::{detect_format, ply, SourceFormat};
use std::path::Path;

/// Which provider a source maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    PointCloud,
    TriMesh,
}

/// Decide the provider for `source`, or `None` if no reader recognises it.
///
/// OBJ files are always meshes; a PLY file is a mesh only if its header
/// declares faces.
pub fn classify(source: &str) -> Option<GeometryKind> {
    let path = Path::new(source);
    let kind = match detect_format(path)? {
        format if format.is_mesh() => GeometryKind::TriMesh,
        SourceFormat::Ply if ply::face_count(path).map(|n| n > 0).unwrap_or(false) => GeometryKind::TriMesh,
        _ => GeometryKind::PointCloud,
    };
    Some(kind)
}

/// Create an unloaded geometry able to read `source`
pub fn create(source: &str) -> Option<SharedGeometry> {
    create_with_config(source, GeometryConfig::default())
}

/// Like [`create`], with explicit loading and level of detail settings
pub fn create_with_config(source: &str, config: GeometryConfig) -> Option<SharedGeometry> {
    let kind = classify(source);
    debug!("Source {} classified as {:?}", source, kind);
    match kind? {
        GeometryKind::PointCloud => Some(share(PointCloudGeometry::with_config(config))),
        GeometryKind::TriMesh => Some(share(TriMeshGeometry::with_config(config))),
    }
}
