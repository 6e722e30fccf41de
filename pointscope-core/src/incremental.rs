//! Caller-owned cursor state for progressive drawing
//!
//! A pass starts with a non-incremental draw and continues with incremental
//! draws against the same camera. The cursor is only meaningful for the view
//! and the load it was started with; [`IncrementalDrawState::is_valid_for`]
//! detects both kinds of staleness so the geometry can restart the pass.

use crate::transform::TransformState;
use nalgebra::Matrix4;

/// Scheduler phase for one geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawPhase {
    /// No partial draw in progress
    #[default]
    Idle,
    /// Some eligible vertices were shaded this pass, more remain
    InProgress,
    /// Every eligible vertex for the current view has been shaded
    Complete,
}

/// Per-geometry incremental draw cursor
#[derive(Debug, Clone, Default)]
pub struct IncrementalDrawState {
    phase: DrawPhase,
    view_key: Option<Matrix4<f64>>,
    generation: u64,
    cursors: Vec<usize>,
}

impl IncrementalDrawState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    /// True if the cursor belongs to this view and this load of the geometry
    pub fn is_valid_for(&self, transform: &TransformState, generation: u64) -> bool {
        self.phase != DrawPhase::Idle
            && self.generation == generation
            && self.view_key.as_ref() == Some(&transform.view_projection())
    }

    /// Forget any pass in progress
    pub fn reset(&mut self) {
        self.phase = DrawPhase::Idle;
        self.view_key = None;
        self.cursors.clear();
    }

    /// Start a fresh pass with `chunks` cursors set to the given starts
    pub fn begin_pass<I>(&mut self, transform: &TransformState, generation: u64, starts: I)
    where
        I: IntoIterator<Item = usize>,
    {
        self.view_key = Some(transform.view_projection());
        self.generation = generation;
        self.cursors.clear();
        self.cursors.extend(starts);
        self.phase = DrawPhase::InProgress;
    }

    /// Cursor of chunk `index`, if a pass is active
    pub fn cursor(&self, index: usize) -> Option<usize> {
        self.cursors.get(index).copied()
    }

    pub fn advance(&mut self, index: usize, count: usize) {
        if let Some(c) = self.cursors.get_mut(index) {
            *c += count;
        }
    }

    /// Record the outcome of a draw call
    pub fn finish_call(&mut self, more_to_draw: bool) {
        self.phase = if more_to_draw {
            DrawPhase::InProgress
        } else {
            DrawPhase::Complete
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{Point3d, Vector3d};

    #[test]
    fn test_pass_lifecycle() {
        let t = TransformState::default();
        let mut state = IncrementalDrawState::new();
        assert_eq!(state.phase(), DrawPhase::Idle);
        assert!(!state.is_valid_for(&t, 0));

        state.begin_pass(&t, 3, vec![0, 100]);
        assert!(state.is_valid_for(&t, 3));
        assert!(!state.is_valid_for(&t, 4));
        state.advance(1, 25);
        assert_eq!(state.cursor(1), Some(125));
        assert_eq!(state.cursor(2), None);

        state.finish_call(false);
        assert_eq!(state.phase(), DrawPhase::Complete);
        assert!(state.is_valid_for(&t, 3));

        state.reset();
        assert_eq!(state.phase(), DrawPhase::Idle);
        assert!(!state.is_valid_for(&t, 3));
    }

    #[test]
    fn test_view_change_invalidates() {
        let t = TransformState::default();
        let moved = TransformState::look_at(
            Point3d::new(1.0, 0.0, 5.0),
            Point3d::origin(),
            Vector3d::y(),
            std::f64::consts::FRAC_PI_4,
            [1280, 720],
            0.1,
            1000.0,
        );
        let mut state = IncrementalDrawState::new();
        state.begin_pass(&t, 0, vec![0]);
        assert!(!state.is_valid_for(&moved, 0));
    }
}
