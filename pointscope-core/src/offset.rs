//! Local coordinate origins for reduced precision vertex storage
//!
//! Storing vertices as 32 bit floats doesn't work for geographic coordinate
//! systems: a small object may sit very far from the world origin, where the
//! float spacing is larger than the detail in the data. Each geometry picks a
//! double precision offset near its data and stores `world - offset`.

use crate::bounds::Box3d;
use crate::point::{Point3d, Point3f, Vector3d};
use serde::{Deserialize, Serialize};

/// How a geometry chooses its offset at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// No offset; only suitable for data near the origin
    Origin,
    /// The first vertex read from the source
    FirstPoint,
    /// Centre of the bounding box of the resident vertices
    #[default]
    BoundsCenter,
}

impl OffsetPolicy {
    /// Choose an offset for the given data, rounded to a multiple of `quantum`.
    ///
    /// A non-positive `quantum` disables rounding.
    pub fn choose(&self, bbox: &Box3d, first_point: Option<&Point3d>, quantum: f64) -> Vector3d {
        let raw = match self {
            OffsetPolicy::Origin => Vector3d::zeros(),
            OffsetPolicy::FirstPoint => first_point.map(|p| p.coords).unwrap_or_else(Vector3d::zeros),
            OffsetPolicy::BoundsCenter => {
                if bbox.is_empty() {
                    Vector3d::zeros()
                } else {
                    bbox.center().coords
                }
            }
        };
        if quantum > 0.0 {
            raw.map(|c| (c / quantum).round() * quantum)
        } else {
            raw
        }
    }
}

/// Convert a world position into offset-relative single precision
pub fn to_local(world: &Point3d, offset: &Vector3d) -> Point3f {
    let v = world.coords - *offset;
    Point3f::new(v.x as f32, v.y as f32, v.z as f32)
}

/// Convert an offset-relative position back into world coordinates
pub fn to_world(local: &Point3f, offset: &Vector3d) -> Point3d {
    Point3d::new(
        local.x as f64 + offset.x,
        local.y as f64 + offset.y,
        local.z as f64 + offset.z,
    )
}

/// Upper bound on the error introduced by [`to_local`] for data inside `bbox`
pub fn local_rounding_error(bbox: &Box3d, offset: &Vector3d) -> f64 {
    if bbox.is_empty() {
        return 0.0;
    }
    let shifted = Box3d::new(bbox.min - *offset, bbox.max - *offset);
    shifted.max_abs_coordinate() * f32::EPSILON as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_center_rounding() {
        let bbox = Box3d::new(
            Point3d::new(500_000.2, 6_000_000.7, 10.0),
            Point3d::new(500_100.2, 6_000_050.7, 30.0),
        );
        let offset = OffsetPolicy::BoundsCenter.choose(&bbox, None, 1.0);
        assert_eq!(offset, Vector3d::new(500_050.0, 6_000_026.0, 20.0));

        let unrounded = OffsetPolicy::BoundsCenter.choose(&bbox, None, 0.0);
        assert_relative_eq!(unrounded, bbox.center().coords);
    }

    #[test]
    fn test_first_point_and_origin() {
        let bbox = Box3d::new(Point3d::new(0.0, 0.0, 0.0), Point3d::new(1.0, 1.0, 1.0));
        let first = Point3d::new(123.4, -56.6, 7.0);
        assert_eq!(
            OffsetPolicy::FirstPoint.choose(&bbox, Some(&first), 1.0),
            Vector3d::new(123.0, -57.0, 7.0)
        );
        assert_eq!(OffsetPolicy::FirstPoint.choose(&bbox, None, 1.0), Vector3d::zeros());
        assert_eq!(OffsetPolicy::Origin.choose(&bbox, Some(&first), 1.0), Vector3d::zeros());
    }

    #[test]
    fn test_local_precision_far_from_origin() {
        let offset = Vector3d::new(6_378_000.0, 0.0, 0.0);
        let world = Point3d::new(6_378_000.123, 0.456, 0.789);
        let local = to_local(&world, &offset);
        let back = to_world(&local, &offset);
        assert_relative_eq!(back, world, epsilon = 1e-6);

        // Without the offset the millimetre detail is lost.
        let naive = to_local(&world, &Vector3d::zeros());
        assert!((to_world(&naive, &Vector3d::zeros()).x - world.x).abs() > 1e-3);
    }
}
