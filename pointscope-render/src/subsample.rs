//! Bounding resident vertex counts
//!
//! Sources larger than the load budget are reduced to a seeded uniform random
//! subset. Source order is kept so file locality survives into the octree build.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Sorted indices of the vertices to keep, or `None` if all of them fit
pub fn subsample_indices(total: usize, max_count: usize, seed: u64) -> Option<Vec<usize>> {
    if total <= max_count {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = index::sample(&mut rng, total, max_count).into_vec();
    keep.sort_unstable();
    Some(keep)
}

/// Old-to-new index map for a kept subset of `total` vertices
pub fn remap_table(total: usize, keep: &[usize]) -> Vec<Option<u32>> {
    let mut table = vec![None; total];
    for (new, &old) in keep.iter().enumerate() {
        table[old] = Some(new as u32);
    }
    table
}

/// Re-index primitives, dropping any that lost a vertex
pub fn remap_primitives<const N: usize>(primitives: &[[u32; N]], table: &[Option<u32>]) -> Vec<[u32; N]> {
    primitives
        .iter()
        .filter_map(|prim| {
            let mut out = [0u32; N];
            for (dst, &src) in out.iter_mut().zip(prim) {
                *dst = table.get(src as usize).copied().flatten()?;
            }
            Some(out)
        })
        .collect()
}

/// Select `keep` entries from `values`
pub fn select<T: Clone>(values: &[T], keep: &[usize]) -> Vec<T> {
    keep.iter().map(|&i| values[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_budget_keeps_everything() {
        assert!(subsample_indices(10, 10, 1).is_none());
        assert!(subsample_indices(0, 0, 1).is_none());
    }

    #[test]
    fn test_sample_is_sorted_unique_and_seeded() {
        let keep = subsample_indices(10_000, 500, 42).unwrap();
        assert_eq!(keep.len(), 500);
        assert!(keep.windows(2).all(|w| w[0] < w[1]));
        assert!(keep.iter().all(|&i| i < 10_000));
        assert_eq!(keep, subsample_indices(10_000, 500, 42).unwrap());
        assert_ne!(keep, subsample_indices(10_000, 500, 43).unwrap());
    }

    #[test]
    fn test_zero_budget() {
        assert_eq!(subsample_indices(5, 0, 1), Some(Vec::new()));
    }

    #[test]
    fn test_primitive_remap_drops_lost_vertices() {
        let table = remap_table(5, &[0, 2, 3]);
        assert_eq!(table, vec![Some(0), None, Some(1), Some(2), None]);
        let faces = [[0, 2, 3], [0, 1, 2], [2, 3, 4]];
        assert_eq!(remap_primitives(&faces, &table), vec![[0, 1, 2]]);
        let edges = [[3, 0], [1, 2]];
        assert_eq!(remap_primitives(&edges, &table), vec![[2, 0]]);
        assert_eq!(select(&['a', 'b', 'c', 'd'], &[1, 3]), vec!['b', 'd']);
    }
}
