//! Searching for the quality that fits a vertex budget

use log::trace;
use pointscope_core::DrawCount;

/// Qualities probed per refinement round
const PROBES_PER_ROUND: usize = 8;

/// Find the highest quality in `0..=1` whose estimate fits `target_vertices`.
///
/// `estimator` maps a batch of qualities to their predicted counts, e.g. a
/// closure around `Geometry::estimate_cost`. Each round probes evenly spaced
/// qualities in the current bracket and narrows to the interval between the
/// last fitting probe and the first one that doesn't. Estimates are assumed
/// non-decreasing in quality. Returns `0.0` if nothing fits.
pub fn find_quality_for_budget<F>(mut estimator: F, target_vertices: f64, iterations: usize) -> f64
where
    F: FnMut(&[f64]) -> Vec<DrawCount>,
{
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    let mut best = 0.0;
    for round in 0..iterations.max(1) {
        let probes: Vec<f64> = (0..=PROBES_PER_ROUND)
            .map(|i| lo + (hi - lo) * i as f64 / PROBES_PER_ROUND as f64)
            .collect();
        let counts = estimator(&probes);
        let fitting = probes
            .iter()
            .zip(&counts)
            .take_while(|(_, count)| count.num_vertices <= target_vertices)
            .count();
        trace!(target: "pointscope", "budget round {}: [{}, {}], {} probes fit", round, lo, hi, fitting);

        if fitting == 0 {
            break;
        }
        best = probes[fitting - 1];
        if fitting == probes.len() {
            break;
        }
        lo = probes[fitting - 1];
        hi = probes[fitting];
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear(max_vertices: f64) -> impl FnMut(&[f64]) -> Vec<DrawCount> {
        move |qs: &[f64]| qs.iter().map(|q| DrawCount::new(q * max_vertices, *q < 1.0)).collect()
    }

    #[test]
    fn test_converges_on_linear_cost() {
        let q = find_quality_for_budget(linear(1_000_000.0), 250_000.0, 6);
        assert!(q <= 0.25);
        assert_relative_eq!(q, 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_everything_fits() {
        assert_eq!(find_quality_for_budget(linear(100.0), 1e9, 4), 1.0);
    }

    #[test]
    fn test_nothing_fits() {
        assert_eq!(find_quality_for_budget(linear(100.0), -1.0, 4), 0.0);
    }

    #[test]
    fn test_step_cost() {
        let step = |qs: &[f64]| -> Vec<DrawCount> {
            qs.iter()
                .map(|&q| DrawCount::new(if q > 0.6 { 1000.0 } else { 10.0 }, true))
                .collect()
        };
        let q = find_quality_for_budget(step, 500.0, 5);
        assert!(q <= 0.6);
        assert!(q > 0.59);
    }
}
