//! Adjacency structure of a planar triangulation.
//!
//! For each node the structure stores a circular, counter-clockwise ordered list of its
//! neighboring nodes, flattened into three parallel arrays:
//!
//! - `list` holds the neighbor node entries, as signed 1-based indices. The final neighbor of a
//!   boundary node is stored as the negative of its index; every other entry is positive.
//! - `lptr` holds, for each `list` entry, the position of the next neighbor in counter-clockwise
//!   order (the first neighbor follows the last one).
//! - `lend` holds, for each node, the position of its last neighbor entry. A node `k` is a
//!   boundary node if and only if `list[lend[k]] < 0`.
//!
//! The first and last neighbors of a boundary node are themselves boundary nodes: the first
//! neighbor is the next boundary node counter-clockwise around the hull, the last one is the
//! previous. The first neighbor of an interior node is arbitrary.

use hashbrown::HashSet;
use log::error;

use crate::error::EngineError;
use crate::types::{Float, Vertex, VertexId};
use crate::utils::cross2;

#[derive(Debug, Clone)]
pub struct Adjacency {
    list: Vec<i64>,
    lptr: Vec<usize>,
    lend: Vec<usize>,
}

impl Adjacency {
    /// Assembles the adjacency lists of `node_count` nodes from a set of counter-clockwise
    /// oriented triangles.
    ///
    /// Neighbor lists are ordered by angle around each node; the single angular gap of a
    /// boundary node determines where its circular list starts and ends.
    pub(crate) fn from_triangles(
        node_count: usize,
        points: &[Vertex],
        triangles: &[[VertexId; 3]],
    ) -> Result<Self, EngineError> {
        let mut neighbor_sets: Vec<HashSet<VertexId>> = vec![HashSet::new(); node_count];
        let mut faces: HashSet<[VertexId; 3]> = HashSet::with_capacity(triangles.len());

        for triangle in triangles {
            let [a, b, c] = *triangle;
            if a == b || b == c || a == c || a >= node_count || b >= node_count || c >= node_count
            {
                return Err(EngineError::Inconsistent(format!(
                    "invalid triangle {:?}",
                    triangle
                )));
            }
            neighbor_sets[a].insert(b);
            neighbor_sets[a].insert(c);
            neighbor_sets[b].insert(a);
            neighbor_sets[b].insert(c);
            neighbor_sets[c].insert(a);
            neighbor_sets[c].insert(b);
            faces.insert(canonical_rotation([a, b, c]));
        }

        let mut list = Vec::with_capacity(triangles.len() * 6);
        let mut lptr = Vec::with_capacity(triangles.len() * 6);
        let mut lend = vec![0; node_count];

        for node in 0..node_count {
            let mut neighbors: Vec<VertexId> = neighbor_sets[node].iter().copied().collect();
            if neighbors.is_empty() {
                return Err(EngineError::Inconsistent(format!(
                    "node {} is not part of any triangle",
                    node
                )));
            }

            // Counter-clockwise angular order around the node
            let origin = points[node];
            neighbors.sort_by(|&m, &n| {
                let angle_m = (points[m] - origin).y.atan2((points[m] - origin).x);
                let angle_n = (points[n] - origin).y.atan2((points[n] - origin).x);
                angle_m.total_cmp(&angle_n)
            });

            // A consecutive neighbor pair (a, b) spans a face if and only if the triangle
            // (node, a, b) exists with that cyclic orientation. Interior nodes have no gap,
            // boundary nodes exactly one: the exterior wedge.
            let count = neighbors.len();
            let mut gaps = Vec::new();
            for i in 0..count {
                let a = neighbors[i];
                let b = neighbors[(i + 1) % count];
                if a == b || !faces.contains(&canonical_rotation([node, a, b])) {
                    gaps.push(i);
                }
            }

            let boundary = match gaps.len() {
                0 => false,
                1 => {
                    // Rotate the list so that it starts right after the exterior wedge
                    neighbors.rotate_left((gaps[0] + 1) % count);
                    true
                }
                _ => {
                    return Err(EngineError::Inconsistent(format!(
                        "node {} has {} angular gaps",
                        node,
                        gaps.len()
                    )));
                }
            };

            let start = list.len();
            for (i, &neighbor) in neighbors.iter().enumerate() {
                let signed = (neighbor + 1) as i64;
                let last = i == count - 1;
                list.push(if boundary && last { -signed } else { signed });
                lptr.push(if last { start } else { start + i + 1 });
            }
            lend[node] = list.len() - 1;
        }

        Ok(Self { list, lptr, lend })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.lend.len()
    }

    /// Raw neighbor entries: signed 1-based node indices, the negative sign marking the final
    /// neighbor of a boundary node.
    #[inline]
    pub fn list(&self) -> &[i64] {
        &self.list
    }

    /// For each `list` entry, the position of the next neighbor in counter-clockwise order.
    #[inline]
    pub fn lptr(&self) -> &[usize] {
        &self.lptr
    }

    /// For each node, the position of its last neighbor entry in `list`.
    #[inline]
    pub fn lend(&self) -> &[usize] {
        &self.lend
    }

    #[inline]
    pub fn is_boundary_node(&self, node: VertexId) -> bool {
        self.list[self.lend[node]] < 0
    }

    #[inline]
    fn node_at(&self, pos: usize) -> VertexId {
        (self.list[pos].unsigned_abs() - 1) as VertexId
    }

    #[inline]
    fn first_neighbor(&self, node: VertexId) -> VertexId {
        self.node_at(self.lptr[self.lend[node]])
    }

    /// The neighbors of `node` in counter-clockwise order, starting from the first entry of its
    /// circular list.
    pub fn neighbors(&self, node: VertexId) -> Vec<VertexId> {
        let last = self.lend[node];
        let mut result = Vec::new();
        let mut pos = self.lptr[last];
        loop {
            result.push(self.node_at(pos));
            if pos == last {
                break;
            }
            pos = self.lptr[pos];
        }
        result
    }

    /// Enumerates the triangles of the triangulation, counter-clockwise oriented. Each triangle
    /// is listed once, from its lowest-index vertex.
    pub fn triangle_list(&self) -> Vec<[VertexId; 3]> {
        let mut triangles = Vec::new();
        for node in 0..self.node_count() {
            let neighbors = self.neighbors(node);
            let count = neighbors.len();
            // The wrap-around pair of a boundary node spans the exterior, not a face
            let pair_count = if self.is_boundary_node(node) {
                count - 1
            } else {
                count
            };
            for i in 0..pair_count {
                let a = neighbors[i];
                let b = neighbors[(i + 1) % count];
                if node < a && node < b {
                    triangles.push([node, a, b]);
                }
            }
        }
        triangles
    }

    /// The boundary nodes of the triangulation, in counter-clockwise order around the hull.
    pub fn boundary_nodes(&self) -> Vec<VertexId> {
        let start = match (0..self.node_count()).find(|&node| self.is_boundary_node(node)) {
            Some(node) => node,
            None => return Vec::new(),
        };

        let mut result = vec![start];
        let mut current = self.first_neighbor(start);
        for _ in 0..self.node_count() {
            if current == start {
                break;
            }
            result.push(current);
            current = self.first_neighbor(current);
        }
        result
    }

    /// Apex of the triangle lying on the left of the directed edge `a`->`b`, or `None` when
    /// `a`->`b` borders the exterior.
    pub(crate) fn apex_left(&self, a: VertexId, b: VertexId) -> Option<VertexId> {
        let last = self.lend[a];
        let mut pos = self.lptr[last];
        loop {
            if self.node_at(pos) == b {
                if pos == last && self.list[last] < 0 {
                    return None;
                }
                return Some(self.node_at(self.lptr[pos]));
            }
            if pos == last {
                return None;
            }
            pos = self.lptr[pos];
        }
    }

    /// Walks the triangulation from `seed` towards `p` and returns the vertices of a triangle
    /// containing `p` (boundary included), or `None` when `p` lies outside the convex hull.
    pub fn locate(&self, points: &[Vertex], p: Vertex, seed: VertexId) -> Option<[VertexId; 3]> {
        let mut a = seed;
        let mut b = self.first_neighbor(a);
        if cross2(points[a], points[b], p) < 0. {
            core::mem::swap(&mut a, &mut b);
        }

        // p lies on the left of (or on) the directed edge a->b; step across whichever edge of
        // the left triangle separates it from p
        for _ in 0..2 * self.list.len() {
            let c = match self.apex_left(a, b) {
                Some(c) => c,
                // a->b is a hull edge with p beyond it
                None => return None,
            };
            if cross2(points[b], points[c], p) < 0. {
                a = c;
            } else if cross2(points[c], points[a], p) < 0. {
                b = c;
            } else {
                return Some([a, b, c]);
            }
        }

        error!("point location walk did not terminate");
        None
    }

    /// Nearest node to `p`, found by descending the adjacency lists from `seed`. Returns the
    /// node index and the squared Euclidean distance to it.
    pub fn nearest_node(&self, points: &[Vertex], p: Vertex, seed: VertexId) -> (VertexId, Float) {
        let mut current = seed;
        let mut current_dist = points[current].distance_squared(p);
        loop {
            let mut improved = false;
            for neighbor in self.neighbors(current) {
                let dist = points[neighbor].distance_squared(p);
                if dist < current_dist {
                    current = neighbor;
                    current_dist = dist;
                    improved = true;
                }
            }
            if !improved {
                return (current, current_dist);
            }
        }
    }
}

#[inline]
fn canonical_rotation([a, b, c]: [VertexId; 3]) -> [VertexId; 3] {
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= a && b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Adjacency;
    use crate::types::Vertex;

    fn square() -> (Vec<Vertex>, Adjacency) {
        // 3-------------2
        // |          /  |
        // |       /     |
        // |    /        |
        // | /           |
        // 0-------------1
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
        ];
        let triangles = [[0, 1, 2], [0, 2, 3]];
        let adjacency = Adjacency::from_triangles(4, &points, &triangles).unwrap();
        (points, adjacency)
    }

    fn fan() -> (Vec<Vertex>, Adjacency) {
        // 3-------------2
        // | \         / |
        // |    \   /    |
        // |      4      |
        // |    /   \    |
        // | /         \ |
        // 0-------------1
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
            Vertex::new(0.5, 0.5),
        ];
        let triangles = [[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
        let adjacency = Adjacency::from_triangles(5, &points, &triangles).unwrap();
        (points, adjacency)
    }

    #[test]
    fn neighbor_lists_are_ccw_and_bounded_by_hull() {
        let (_, adjacency) = square();

        assert_eq!(vec![1, 2, 3], adjacency.neighbors(0));
        assert_eq!(vec![2, 0], adjacency.neighbors(1));
        assert_eq!(vec![3, 0, 1], adjacency.neighbors(2));
        assert_eq!(vec![0, 2], adjacency.neighbors(3));
    }

    #[test]
    fn sign_convention_marks_boundary_nodes() {
        let (_, adjacency) = square();

        for node in 0..4 {
            assert!(adjacency.is_boundary_node(node));
            assert!(adjacency.list()[adjacency.lend()[node]] < 0);
        }
    }

    #[test]
    fn interior_node_has_no_negative_entry() {
        let (_, adjacency) = fan();

        assert!(!adjacency.is_boundary_node(4));
        assert_eq!(4, adjacency.neighbors(4).len());
        let last = adjacency.lend()[4];
        assert!(adjacency.list()[last] > 0);
    }

    #[test]
    fn triangle_enumeration_lists_each_face_once() {
        let (_, adjacency) = square();
        assert_eq!(vec![[0, 1, 2], [0, 2, 3]], adjacency.triangle_list());

        let (_, adjacency) = fan();
        let triangles = adjacency.triangle_list();
        assert_eq!(4, triangles.len());
        for triangle in &triangles {
            assert!(triangle.contains(&4));
        }
    }

    #[test]
    fn boundary_walk_is_ccw() {
        let (_, adjacency) = square();
        assert_eq!(vec![0, 1, 2, 3], adjacency.boundary_nodes());

        let (_, adjacency) = fan();
        assert_eq!(vec![0, 1, 2, 3], adjacency.boundary_nodes());
    }

    #[test]
    fn locate_inside_and_outside() {
        let (points, adjacency) = square();

        let mut found = adjacency
            .locate(&points, Vertex::new(0.6, 0.2), 0)
            .expect("point is inside the hull");
        found.sort();
        assert_eq!([0, 1, 2], found);

        assert_eq!(None, adjacency.locate(&points, Vertex::new(2., 0.5), 0));
        assert_eq!(None, adjacency.locate(&points, Vertex::new(-0.5, -0.5), 2));
    }

    #[test]
    fn locate_on_boundary_counts_as_inside() {
        let (points, adjacency) = square();

        let found = adjacency.locate(&points, Vertex::new(0.5, 0.), 3);
        assert!(found.is_some());
    }

    #[test]
    fn nearest_node_descends_to_the_closest_vertex() {
        let (points, adjacency) = fan();

        let (node, dist) = adjacency.nearest_node(&points, Vertex::new(0.9, 0.95), 0);
        assert_eq!(2, node);
        assert!((dist - (0.1f64.powi(2) + 0.05f64.powi(2))).abs() < 1e-12);

        let (node, _) = adjacency.nearest_node(&points, Vertex::new(0.5, 0.45), 3);
        assert_eq!(4, node);
    }
}
