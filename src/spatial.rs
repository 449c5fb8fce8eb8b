//! k-d tree over a point set, used to accelerate k-nearest-neighbour lookups.
//!
//! The tree is built once, over the full point set, and is immutable afterwards; queries are
//! read-only and return Euclidean distances in ascending order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{Float, Vertex, VertexId};

#[derive(Debug)]
struct KdNode {
    point: VertexId,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug)]
pub struct KdTree {
    points: Vec<Vertex>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    /// Builds a tree by recursive median splits along alternating axes.
    pub fn build(points: &[Vertex]) -> Self {
        let mut indices: Vec<VertexId> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = build_node(points, &mut indices, 0, &mut nodes);
        Self {
            points: points.to_vec(),
            nodes,
            root,
        }
    }

    /// The `k` nearest points to `p` within `max_distance`, as `(distance, point index)` pairs
    /// sorted by ascending distance. Fewer than `k` entries are returned when the distance bound
    /// cuts the candidate set short.
    pub fn query(&self, p: Vertex, k: usize, max_distance: Float) -> Vec<(Float, VertexId)> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        self.search(self.root, p, k, max_distance, 0, &mut heap);
        heap.into_sorted_vec()
            .into_iter()
            .map(|entry| (entry.dist, entry.node))
            .collect()
    }

    fn search(
        &self,
        node: Option<usize>,
        p: Vertex,
        k: usize,
        max_distance: Float,
        depth: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        let index = match node {
            Some(index) => index,
            None => return,
        };
        let kd_node = &self.nodes[index];
        let point = self.points[kd_node.point];

        let dist = point.distance(p);
        if dist <= max_distance {
            heap.push(HeapEntry {
                dist,
                node: kd_node.point,
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        let axis = depth % 2;
        let delta = axis_value(p, axis) - axis_value(point, axis);
        let (near, far) = if delta < 0. {
            (kd_node.left, kd_node.right)
        } else {
            (kd_node.right, kd_node.left)
        };

        self.search(near, p, k, max_distance, depth + 1, heap);

        // Only cross the splitting plane when closer matches can still exist on the other side
        let worst = if heap.len() == k {
            heap.peek().map(|entry| entry.dist).unwrap_or(max_distance)
        } else {
            max_distance
        };
        if delta.abs() <= worst {
            self.search(far, p, k, max_distance, depth + 1, heap);
        }
    }
}

fn build_node(
    points: &[Vertex],
    indices: &mut [VertexId],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> Option<usize> {
    if indices.is_empty() {
        return None;
    }
    let axis = depth % 2;
    let mid = indices.len() / 2;
    indices.select_nth_unstable_by(mid, |&a, &b| {
        axis_value(points[a], axis).total_cmp(&axis_value(points[b], axis))
    });

    let node_index = nodes.len();
    nodes.push(KdNode {
        point: indices[mid],
        left: None,
        right: None,
    });

    let (left_indices, rest) = indices.split_at_mut(mid);
    let left = build_node(points, left_indices, depth + 1, nodes);
    let right = build_node(points, &mut rest[1..], depth + 1, nodes);

    nodes[node_index].left = left;
    nodes[node_index].right = right;
    Some(node_index)
}

#[inline]
fn axis_value(p: Vertex, axis: usize) -> Float {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

struct HeapEntry {
    dist: Float,
    node: VertexId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.node.cmp(&other.node))
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::KdTree;
    use crate::types::{Float, Vertex};

    fn scattered_points(count: usize, seed: u64) -> Vec<Vertex> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| Vertex::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)))
            .collect()
    }

    fn brute_force(points: &[Vertex], p: Vertex, k: usize) -> Vec<(Float, usize)> {
        let mut all: Vec<(Float, usize)> = points
            .iter()
            .enumerate()
            .map(|(index, point)| (point.distance(p), index))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0));
        all.truncate(k);
        all
    }

    #[test]
    fn matches_brute_force_search() {
        let points = scattered_points(60, 31);
        let tree = KdTree::build(&points);

        for &query in &[
            Vertex::new(0., 0.),
            Vertex::new(-7.5, 3.),
            Vertex::new(11., -11.),
        ] {
            let found = tree.query(query, 4, Float::INFINITY);
            let expected = brute_force(&points, query, 4);
            assert_eq!(expected.len(), found.len());
            for (expected_entry, found_entry) in expected.iter().zip(found.iter()) {
                assert_eq!(expected_entry.1, found_entry.1);
                assert!((expected_entry.0 - found_entry.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn respects_the_distance_bound() {
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(5., 0.),
        ];
        let tree = KdTree::build(&points);

        let found = tree.query(Vertex::new(0.1, 0.), 3, 2.);
        assert_eq!(2, found.len());
        assert_eq!(0, found[0].1);
        assert_eq!(1, found[1].1);
    }

    #[test]
    fn empty_for_zero_k() {
        let points = scattered_points(10, 7);
        let tree = KdTree::build(&points);
        assert!(tree.query(Vertex::new(0., 0.), 0, Float::INFINITY).is_empty());
    }
}
