//! # pointscope
//!
//! Progressive, quality-adaptive drawing of very large point clouds and meshes.
//!
//! This is the umbrella crate that provides convenient access to all pointscope
//! functionality. You can use this crate to get everything in one place, or use
//! individual crates for more granular control over dependencies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pointscope::prelude::*;
//!
//! let geometry = pointscope::render::create("survey.las").expect("supported format");
//! write_geometry(&geometry)
//!     .load_file("survey.las", 10_000_000, &mut ProgressReporter::silent())
//!     .expect("readable file");
//!
//! let transform = TransformState::default();
//! let mut state = IncrementalDrawState::new();
//! let mut shader = RecordingShader::counting();
//! let count = read_geometry(&geometry).draw_points(&mut shader, &transform, 0.5, false, &mut state);
//! println!("drew {} vertices, more: {}", count.num_vertices, count.more_to_draw);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables `io`
//! - `io`: Direct access to the file readers
//! - `gpu`: wgpu vertex buffer upload for drawn batches

// Re-export core functionality
pub use pointscope_core::*;

pub use pointscope_render as render;

#[cfg(feature = "io")]
pub use pointscope_io as io;

/// Convenient imports for common use cases
pub mod prelude {
    pub use pointscope_core::*;

    pub use pointscope_render::{
        create, create_with_config, find_quality_for_budget, PointCloudGeometry, RecordingShader, Scene,
        TriMeshGeometry,
    };

    #[cfg(feature = "gpu")]
    pub use pointscope_render::{GpuContext, GpuPointUploader};

    #[cfg(feature = "io")]
    pub use pointscope_io::{detect_format, MeshData, PointData, SourceFormat};
}
