//! Geometry providers for pointscope
//!
//! [`PointCloudGeometry`] partitions its points into a leaf-shuffled octree
//! and draws them progressively with a distance based level of detail;
//! [`TriMeshGeometry`] draws meshes in one call and picks by ray intersection.
//! [`create`] picks the provider for a source, and [`Scene`] drives several
//! geometries with one incremental draw cursor each.

pub mod octree;
pub mod lod;
pub mod subsample;
pub mod point_cloud;
pub mod mesh;
pub mod factory;
pub mod budget;
pub mod scene;
pub mod headless;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use octree::{Octree, OctreeLeaf, OctreeParams};
pub use lod::{plan_pass, DrawPlan, LeafBatch, LodModel};
pub use point_cloud::PointCloudGeometry;
pub use mesh::TriMeshGeometry;
pub use factory::{classify, create, create_with_config, GeometryKind};
pub use budget::find_quality_for_budget;
pub use scene::Scene;
pub use headless::RecordingShader;

#[cfg(feature = "gpu")]
pub use gpu::{GpuContext, GpuPointUploader, GpuVertex};
