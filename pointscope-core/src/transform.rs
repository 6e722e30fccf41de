//! Camera transform snapshots and view frustum culling

use crate::bounds::Box3d;
use crate::point::{Point3d, Vector3d};
use nalgebra::{Matrix4, Perspective3, Vector4};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of the camera for one frame.
///
/// Both matrices act on world coordinates in double precision. Geometries
/// combine them with their own offset before narrowing to `f32`, which keeps
/// the model-view-projection free of large translations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    pub view: Matrix4<f64>,
    pub projection: Matrix4<f64>,
    /// Viewport size in pixels
    pub viewport: [u32; 2],
}

impl TransformState {
    pub fn new(view: Matrix4<f64>, projection: Matrix4<f64>, viewport: [u32; 2]) -> Self {
        Self {
            view,
            projection,
            viewport,
        }
    }

    /// Build a right handed perspective camera looking from `eye` to `target`
    pub fn look_at(
        eye: Point3d,
        target: Point3d,
        up: Vector3d,
        fovy: f64,
        viewport: [u32; 2],
        near: f64,
        far: f64,
    ) -> Self {
        let aspect = viewport[0].max(1) as f64 / viewport[1].max(1) as f64;
        let view = Matrix4::look_at_rh(&eye, &target, &up);
        let projection = Perspective3::new(aspect, fovy, near, far).into_inner();
        Self::new(view, projection, viewport)
    }

    pub fn view_projection(&self) -> Matrix4<f64> {
        self.projection * self.view
    }

    /// Model-view-projection for vertices stored relative to `offset`
    pub fn offset_model_view_projection(&self, offset: &Vector3d) -> Matrix4<f32> {
        let model = Matrix4::new_translation(offset);
        (self.view_projection() * model).cast::<f32>()
    }

    /// Camera position in world coordinates
    pub fn camera_position(&self) -> Point3d {
        match self.view.try_inverse() {
            Some(inv) => Point3d::from_homogeneous(inv * Vector4::new(0.0, 0.0, 0.0, 1.0))
                .unwrap_or_else(Point3d::origin),
            None => Point3d::origin(),
        }
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::look_at(
            Point3d::new(0.0, 0.0, 5.0),
            Point3d::origin(),
            Vector3d::new(0.0, 1.0, 0.0),
            std::f64::consts::FRAC_PI_4,
            [1280, 720],
            0.1,
            1000.0,
        )
    }
}

/// A plane `n·p + d = 0` with the normal pointing into the frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3d,
    pub d: f64,
}

impl Plane {
    fn from_row(row: Vector4<f64>) -> Self {
        let normal = Vector3d::new(row.x, row.y, row.z);
        let len = normal.norm();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: row.w / len,
            }
        } else {
            Self { normal, d: row.w }
        }
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }
}

/// Six clip planes extracted from a view-projection matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes with the Gribb-Hartmann method (OpenGL clip depth)
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let r = |i: usize| Vector4::new(m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]);
        let (r0, r1, r2, r3) = (r(0), r(1), r(2), r(3));
        Self {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r3 + r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    pub fn contains_point(&self, p: &Point3d) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(p) >= 0.0)
    }

    /// Conservative box test: false only if the box is fully outside one plane
    pub fn intersects_box(&self, bbox: &Box3d) -> bool {
        if bbox.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let p = Point3d::new(
                if plane.normal.x >= 0.0 { bbox.max.x } else { bbox.min.x },
                if plane.normal.y >= 0.0 { bbox.max.y } else { bbox.min.y },
                if plane.normal.z >= 0.0 { bbox.max.z } else { bbox.min.z },
            );
            plane.signed_distance(&p) >= 0.0
        })
    }
}
