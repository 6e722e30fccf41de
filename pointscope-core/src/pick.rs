//! Ray based picking primitives

use crate::point::{Point3d, Vector3d};

/// A ray with a normalised direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vector3d,
}

impl Ray {
    /// Create a ray, normalising `direction`. Returns `None` for a zero direction.
    pub fn new(origin: Point3d, direction: Vector3d) -> Option<Self> {
        let direction = direction.try_normalize(f64::EPSILON)?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// Split the offset from the origin to `p` into (along ray, perpendicular) lengths
    pub fn decompose(&self, p: &Point3d) -> (f64, f64) {
        let v = p - self.origin;
        let along = self.direction.dot(&v);
        let perp = (v - self.direction * along).norm();
        (along, perp)
    }

    /// Distance from `p` to the ray with the along-ray component scaled.
    ///
    /// `sqrt(perp² + (longitudinal_scale · along)²)`. A small scale makes lateral
    /// error dominate, so points "under the cursor" win even when far away.
    pub fn weighted_distance(&self, p: &Point3d, longitudinal_scale: f64) -> f64 {
        let (along, perp) = self.decompose(p);
        let scaled = longitudinal_scale * along;
        (perp * perp + scaled * scaled).sqrt()
    }

    /// Möller-Trumbore intersection; returns the ray parameter of the hit
    pub fn intersect_triangle(&self, a: &Point3d, b: &Point3d, c: &Point3d) -> Option<f64> {
        const EPS: f64 = 1e-12;
        let e1 = b - a;
        let e2 = c - a;
        let h = self.direction.cross(&e2);
        let det = e1.dot(&h);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = inv_det * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = inv_det * e2.dot(&q);
        (t > EPS).then_some(t)
    }
}

/// Result of a successful pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickResult {
    /// World position of the chosen vertex or surface point
    pub position: Point3d,
    /// Weighted distance from the ray; for a surface hit only the scaled depth remains
    pub distance: f64,
}

/// Index and weighted distance of the point closest to `ray`
pub fn closest_point_to_ray<I>(points: I, ray: &Ray, longitudinal_scale: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = Point3d>,
{
    points
        .into_iter()
        .enumerate()
        .map(|(i, p)| (i, ray.weighted_distance(&p, longitudinal_scale)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn z_ray() -> Ray {
        Ray::new(Point3d::origin(), Vector3d::new(0.0, 0.0, -3.0)).unwrap()
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert!(Ray::new(Point3d::origin(), Vector3d::zeros()).is_none());
    }

    #[test]
    fn test_decompose() {
        let (along, perp) = z_ray().decompose(&Point3d::new(3.0, 4.0, -10.0));
        assert_relative_eq!(along, 10.0);
        assert_relative_eq!(perp, 5.0);
    }

    #[test]
    fn test_longitudinal_scale_flips_choice() {
        let ray = z_ray();
        // Laterally close but deep, versus laterally far but shallow.
        let candidates = [Point3d::new(1.0, 0.0, -10.0), Point3d::new(5.0, 0.0, -1.0)];

        let (near_lateral, _) = closest_point_to_ray(candidates, &ray, 0.1).unwrap();
        assert_eq!(near_lateral, 0);

        let (near_depth, _) = closest_point_to_ray(candidates, &ray, 2.0).unwrap();
        assert_eq!(near_depth, 1);
    }

    #[test]
    fn test_triangle_intersection() {
        let ray = z_ray();
        let a = Point3d::new(-1.0, -1.0, -4.0);
        let b = Point3d::new(1.0, -1.0, -4.0);
        let c = Point3d::new(0.0, 1.0, -4.0);
        assert_relative_eq!(ray.intersect_triangle(&a, &b, &c).unwrap(), 4.0);
        assert_relative_eq!(ray.at(4.0), Point3d::new(0.0, 0.0, -4.0));

        let miss = Ray::new(Point3d::new(5.0, 0.0, 0.0), Vector3d::new(0.0, 0.0, -1.0)).unwrap();
        assert!(miss.intersect_triangle(&a, &b, &c).is_none());

        let behind = Ray::new(Point3d::origin(), Vector3d::new(0.0, 0.0, 1.0)).unwrap();
        assert!(behind.intersect_triangle(&a, &b, &c).is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(closest_point_to_ray(Vec::<Point3d>::new(), &z_ray(), 1.0).is_none());
    }
}
