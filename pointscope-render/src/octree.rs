//! Spatial partition of a resident point set
//!
//! The octree never owns vertices. Building it produces a permutation that
//! makes every leaf a contiguous range of the vertex buffer, and each range is
//! shuffled so that any prefix of a leaf is a uniform random sample of it.

use log::debug;
use pointscope_core::{Box3d, Frustum, Point3d, MAX_OCTREE_DEPTH};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::ops::Range;

/// A contiguous run of vertices sharing one octree cell
#[derive(Debug, Clone, PartialEq)]
pub struct OctreeLeaf {
    /// Tight world bounds of the points in the leaf
    pub bbox: Box3d,
    pub range: Range<usize>,
}

impl OctreeLeaf {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Debug, Clone)]
struct OctreeNode {
    bbox: Box3d,
    children: Vec<usize>,
    leaf: Option<usize>,
}

/// Octree over a vertex buffer, stored as a flat node arena
#[derive(Debug, Clone, Default)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    leaves: Vec<OctreeLeaf>,
    depth: u32,
}

/// Build limits for [`Octree::build`]
#[derive(Debug, Clone, Copy)]
pub struct OctreeParams {
    pub leaf_point_count: usize,
    pub max_depth: u32,
    pub seed: u64,
}

impl Octree {
    /// Partition `positions` and return the tree with the permutation to
    /// apply to the vertex buffer: new slot `i` holds old vertex `order[i]`.
    ///
    /// `max_depth` is capped at [`MAX_OCTREE_DEPTH`].
    pub fn build(positions: &[Point3d], mut params: OctreeParams) -> (Self, Vec<usize>) {
        params.max_depth = params.max_depth.min(MAX_OCTREE_DEPTH);
        let mut tree = Octree::default();
        let mut order: Vec<usize> = (0..positions.len()).collect();
        if positions.is_empty() {
            return (tree, order);
        }

        let root_box = Box3d::from_points(positions);
        tree.build_node(positions, &mut order, 0, root_box, 0, &params);

        let mut rng = StdRng::seed_from_u64(params.seed);
        for leaf in &tree.leaves {
            order[leaf.range.clone()].shuffle(&mut rng);
        }

        debug!(
            "Built octree: {} nodes, {} leaves, depth {}, {} points",
            tree.nodes.len(),
            tree.leaves.len(),
            tree.depth,
            positions.len()
        );
        (tree, order)
    }

    fn build_node(
        &mut self,
        positions: &[Point3d],
        indices: &mut [usize],
        base: usize,
        cell: Box3d,
        depth: u32,
        params: &OctreeParams,
    ) -> usize {
        self.depth = self.depth.max(depth);
        let node_index = self.nodes.len();
        let bbox = Box3d::from_points(indices.iter().map(|&i| &positions[i]));
        self.nodes.push(OctreeNode {
            bbox,
            children: Vec::new(),
            leaf: None,
        });

        if indices.len() <= params.leaf_point_count.max(1) || depth >= params.max_depth {
            self.nodes[node_index].leaf = Some(self.leaves.len());
            self.leaves.push(OctreeLeaf {
                bbox,
                range: base..base + indices.len(),
            });
            return node_index;
        }

        let center = cell.center();
        let octant_of = |p: &Point3d| {
            (p.x >= center.x) as usize | ((p.y >= center.y) as usize) << 1 | ((p.z >= center.z) as usize) << 2
        };
        indices.sort_unstable_by_key(|&i| octant_of(&positions[i]));

        let mut start = 0;
        let mut children = Vec::new();
        for octant in 0..8 {
            let end = start + indices[start..]
                .iter()
                .take_while(|&&i| octant_of(&positions[i]) == octant)
                .count();
            if end > start {
                let child = self.build_node(
                    positions,
                    &mut indices[start..end],
                    base + start,
                    cell.octant(octant),
                    depth + 1,
                    params,
                );
                children.push(child);
            }
            start = end;
        }
        self.nodes[node_index].children = children;
        node_index
    }

    pub fn leaves(&self) -> &[OctreeLeaf] {
        &self.leaves
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Indices of leaves not entirely outside `frustum`, in buffer order
    pub fn visible_leaves(&self, frustum: &Frustum) -> Vec<usize> {
        let mut visible = Vec::new();
        if self.nodes.is_empty() {
            return visible;
        }
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !frustum.intersects_box(&node.bbox) {
                continue;
            }
            match node.leaf {
                Some(leaf) => visible.push(leaf),
                None => stack.extend(node.children.iter().rev()),
            }
        }
        visible
    }
}
