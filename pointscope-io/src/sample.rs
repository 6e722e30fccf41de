//! Bounded point collection while a source is streamed
//!
//! Readers push every decoded record into a [`PointSampler`]. Once the budget
//! is full each further record replaces a random slot with probability
//! `budget / seen` (reservoir sampling), so memory stays proportional to the
//! budget however large the source is, and the kept points are a uniform
//! sample of the whole file.

use crate::PointData;
use pointscope_core::{Error, Point3d, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Initial reservation, so a wildly wrong header count cannot allocate up front
const MAX_INITIAL_CAPACITY: usize = 1 << 16;

/// How many points a reader may keep, and the seed used to choose them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointBudget {
    pub max_points: usize,
    pub seed: u64,
}

impl PointBudget {
    pub fn new(max_points: usize, seed: u64) -> Self {
        Self { max_points, seed }
    }

    /// Keep every point of the source
    pub fn unlimited() -> Self {
        Self::new(usize::MAX, 0)
    }
}

impl Default for PointBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Reservoir of decoded points
#[derive(Debug)]
pub struct PointSampler {
    data: PointData,
    max_points: usize,
    seen: usize,
    rng: StdRng,
}

impl PointSampler {
    /// `size_hint` is the record count the source claims to hold, if any
    pub fn new(budget: PointBudget, has_color: bool, has_intensity: bool, size_hint: usize) -> Self {
        let capacity = size_hint.min(budget.max_points).min(MAX_INITIAL_CAPACITY);
        Self {
            data: PointData {
                positions: Vec::with_capacity(capacity),
                colors: has_color.then(|| Vec::with_capacity(capacity)),
                intensities: has_intensity.then(|| Vec::with_capacity(capacity)),
                source_point_count: 0,
            },
            max_points: budget.max_points,
            seen: 0,
            rng: StdRng::seed_from_u64(budget.seed),
        }
    }

    /// Records offered so far
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Offer one record. Attributes the sampler was not created with are ignored.
    pub fn push(&mut self, position: Point3d, color: [f32; 3], intensity: f32) {
        self.seen += 1;
        let slot = if self.data.positions.len() < self.max_points {
            None
        } else {
            let j = self.rng.gen_range(0..self.seen);
            if j >= self.max_points {
                return;
            }
            Some(j)
        };

        let data = &mut self.data;
        match slot {
            None => {
                data.positions.push(position);
                if let Some(colors) = data.colors.as_mut() {
                    colors.push(color);
                }
                if let Some(intensities) = data.intensities.as_mut() {
                    intensities.push(intensity);
                }
            }
            Some(j) => {
                data.positions[j] = position;
                if let Some(colors) = data.colors.as_mut() {
                    colors[j] = color;
                }
                if let Some(intensities) = data.intensities.as_mut() {
                    intensities[j] = intensity;
                }
            }
        }
    }

    pub fn finish(mut self) -> PointData {
        self.data.source_point_count = self.seen;
        self.data
    }
}

/// A position, or an error naming `context` if any coordinate is NaN or infinite
pub fn finite_point(x: f64, y: f64, z: f64, context: impl FnOnce() -> String) -> Result<Point3d> {
    if x.is_finite() && y.is_finite() && z.is_finite() {
        Ok(Point3d::new(x, y, z))
    } else {
        Err(Error::InvalidData(format!("non-finite coordinate ({}, {}, {}) {}", x, y, z, context())))
    }
}
