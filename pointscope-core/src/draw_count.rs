//! Estimate of the amount of geometry drawn in a frame

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Estimate of vertices shaded and whether more remain to be drawn.
///
/// `num_vertices` is a real number so estimates from several geometries can be
/// combined without rounding. Accumulation sums the vertex counts and ORs the
/// `more_to_draw` flags; the default value `(0, false)` is the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawCount {
    pub num_vertices: f64,
    pub more_to_draw: bool,
}

impl DrawCount {
    pub fn new(num_vertices: f64, more_to_draw: bool) -> Self {
        Self {
            num_vertices,
            more_to_draw,
        }
    }

    /// A count of `n` vertices with nothing left over
    pub fn complete(n: usize) -> Self {
        Self::new(n as f64, false)
    }

    pub fn is_empty(&self) -> bool {
        self.num_vertices == 0.0 && !self.more_to_draw
    }
}

impl AddAssign for DrawCount {
    fn add_assign(&mut self, rhs: Self) {
        self.num_vertices += rhs.num_vertices;
        self.more_to_draw |= rhs.more_to_draw;
    }
}

impl Add for DrawCount {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sum for DrawCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a DrawCount> for DrawCount {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let a = DrawCount::new(42.0, true);
        let mut b = a;
        b += DrawCount::default();
        assert_eq!(a, b);
        assert!(DrawCount::default().is_empty());
    }

    #[test]
    fn test_accumulation_commutes_and_associates() {
        let counts = [
            DrawCount::new(10.0, false),
            DrawCount::new(250.0, true),
            DrawCount::new(3.0, false),
        ];
        let (a, b, c) = (counts[0], counts[1], counts[2]);

        let mut abc = a;
        abc += b;
        abc += c;
        let mut acb = a;
        acb += c;
        acb += b;
        let mut cba = c;
        cba += b;
        cba += a;

        assert_eq!(abc, acb);
        assert_eq!(abc, cba);
        assert_eq!(abc, a + (b + c));
        assert_eq!(abc.num_vertices, 263.0);
        assert!(abc.more_to_draw);
    }

    #[test]
    fn test_sum() {
        let counts = vec![DrawCount::complete(5), DrawCount::complete(7)];
        let total: DrawCount = counts.iter().sum();
        assert_eq!(total, DrawCount::new(12.0, false));
    }
}
