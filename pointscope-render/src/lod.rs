//! Level of detail cost model
//!
//! Each visible octree leaf draws a prefix of its (shuffled) range whose
//! length falls off with the square of the camera distance, scaled by the
//! quality knob. Drawing and estimating share [`plan_pass`], so an estimate is
//! exactly what the matching draw would do.

use crate::octree::{Octree, OctreeLeaf};
use pointscope_core::{Box3d, DrawCount, GeometryConfig, IncrementalDrawState, Point3d, TransformState};
use std::ops::Range;

/// Distance falloff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodModel {
    /// Distance below which quality 1 draws a leaf in full
    pub draw_all_distance: f64,
    /// Floor on the distance so nearby leaves don't blow up the fraction
    pub min_lod_distance: f64,
}

impl LodModel {
    pub fn new(draw_all_distance: f64, min_lod_distance: f64) -> Self {
        Self {
            draw_all_distance,
            min_lod_distance,
        }
    }

    pub fn from_config(config: &GeometryConfig) -> Self {
        Self::new(config.draw_all_distance, config.min_lod_distance)
    }

    /// Fraction of a leaf inside `bbox` to draw at `quality`, in `0..=1`
    pub fn fraction(&self, bbox: &Box3d, eye: &Point3d, quality: f64) -> f64 {
        if !(quality > 0.0) || bbox.is_empty() {
            return 0.0;
        }
        let half_diagonal = 0.5 * bbox.diagonal();
        let dist = ((bbox.center() - eye).norm() - half_diagonal).max(self.min_lod_distance);
        let ratio = self.draw_all_distance / dist;
        (quality * ratio * ratio).min(1.0)
    }

    /// Number of points of `leaf` to draw at `quality`
    pub fn chunk_size(&self, leaf: &OctreeLeaf, eye: &Point3d, quality: f64) -> usize {
        let n = leaf.len();
        let chunk = (n as f64 * self.fraction(&leaf.bbox, eye, quality)).ceil();
        (chunk as usize).min(n)
    }
}

impl Default for LodModel {
    fn default() -> Self {
        Self::from_config(&GeometryConfig::default())
    }
}

/// One contiguous batch of a draw
#[derive(Debug, Clone, PartialEq)]
pub struct LeafBatch {
    pub leaf: usize,
    pub range: Range<usize>,
}

/// The batches a draw call would shade, and its resulting count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPlan {
    pub batches: Vec<LeafBatch>,
    pub count: DrawCount,
    /// True if the call continues a pass rather than starting one
    pub continues_pass: bool,
}

/// Work out what a draw at `quality` would do without touching `state`.
///
/// An incremental call continues from the cursors in `state` only if the
/// pass was started with the same transform and the same load generation;
/// otherwise it behaves like a fresh, non-incremental call.
pub fn plan_pass(
    octree: &Octree,
    lod: &LodModel,
    transform: &TransformState,
    quality: f64,
    incremental: bool,
    state: &IncrementalDrawState,
    generation: u64,
) -> DrawPlan {
    let mut plan = DrawPlan {
        continues_pass: incremental && state.is_valid_for(transform, generation),
        ..Default::default()
    };
    if octree.is_empty() {
        return plan;
    }

    let eye = transform.camera_position();
    let leaves = octree.leaves();
    let mut drawn = 0usize;
    for index in octree.visible_leaves(&transform.frustum()) {
        let leaf = &leaves[index];
        let chunk = lod.chunk_size(leaf, &eye, quality);
        let start = if plan.continues_pass {
            state
                .cursor(index)
                .unwrap_or(leaf.range.start)
                .clamp(leaf.range.start, leaf.range.end)
        } else {
            leaf.range.start
        };
        let end = (start + chunk).min(leaf.range.end);
        if end > start {
            drawn += end - start;
            plan.batches.push(LeafBatch {
                leaf: index,
                range: start..end,
            });
        }
        plan.count.more_to_draw |= end < leaf.range.end;
    }
    plan.count.num_vertices = drawn as f64;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::OctreeParams;
    use approx::assert_relative_eq;
    use pointscope_core::Vector3d;

    fn unit_leaf(n: usize, center: Point3d) -> OctreeLeaf {
        let h = Vector3d::new(0.5, 0.5, 0.5);
        OctreeLeaf {
            bbox: Box3d::new(center - h, center + h),
            range: 0..n,
        }
    }

    #[test]
    fn test_fraction_falloff() {
        let leaf = unit_leaf(1000, Point3d::new(0.0, 0.0, 0.0));

        let lod = LodModel::new(100.0, 10.0);
        let near = Point3d::new(0.0, 0.0, 5.0);
        assert_relative_eq!(lod.fraction(&leaf.bbox, &near, 0.01), 1.0);

        // Inside the distance floor, so the ratio is exactly 0.5
        let lod = LodModel::new(100.0, 200.0);
        assert_relative_eq!(lod.fraction(&leaf.bbox, &near, 1.0), 0.25);
        assert_eq!(lod.chunk_size(&leaf, &near, 1.0), 250);
        assert_eq!(lod.chunk_size(&leaf, &near, 0.5), 125);
        assert_eq!(lod.chunk_size(&leaf, &near, 0.0), 0);
        assert_eq!(lod.chunk_size(&leaf, &near, -1.0), 0);
        assert_eq!(lod.chunk_size(&leaf, &near, 10.0), 1000);
    }

    #[test]
    fn test_chunk_monotonic_in_quality() {
        let lod = LodModel::new(50.0, 1.0);
        let leaf = unit_leaf(777, Point3d::new(3.0, 4.0, 5.0));
        let eye = Point3d::new(100.0, -20.0, 300.0);
        let mut last = 0;
        for step in 0..=100 {
            let chunk = lod.chunk_size(&leaf, &eye, step as f64 / 50.0);
            assert!(chunk >= last);
            last = chunk;
        }
        assert!(last <= 777);
    }

    #[test]
    fn test_plan_matches_cursor_state() {
        let points: Vec<Point3d> = (0..400)
            .map(|i| Point3d::new((i % 20) as f64, (i / 20) as f64, 0.0))
            .collect();
        let (octree, _) = Octree::build(
            &points,
            OctreeParams {
                leaf_point_count: 50,
                max_depth: 8,
                seed: 3,
            },
        );
        let transform = TransformState::look_at(
            Point3d::new(10.0, 10.0, 500.0),
            Point3d::new(10.0, 10.0, 0.0),
            Vector3d::y(),
            std::f64::consts::FRAC_PI_4,
            [640, 480],
            0.1,
            2000.0,
        );
        let lod = LodModel::new(100.0, 10.0);
        let mut state = IncrementalDrawState::new();

        let fresh = plan_pass(&octree, &lod, &transform, 0.5, true, &state, 1);
        assert!(!fresh.continues_pass);
        assert!(fresh.count.more_to_draw);

        state.begin_pass(&transform, 1, octree.leaves().iter().map(|l| l.range.start));
        for batch in &fresh.batches {
            state.advance(batch.leaf, batch.range.len());
        }
        let next = plan_pass(&octree, &lod, &transform, 0.5, true, &state, 1);
        assert!(next.continues_pass);
        for (a, b) in fresh.batches.iter().zip(&next.batches) {
            assert_eq!(a.range.end, b.range.start);
        }

        // A reload invalidates the cursors
        let stale = plan_pass(&octree, &lod, &transform, 0.5, true, &state, 2);
        assert_eq!(stale, fresh);
    }
}
