//! Persistent planar Delaunay triangulation over a set of 2d points.
//!
//! [`Triangulation`] owns the point set, the permutation used to feed the points to the engine,
//! the adjacency structure and the derived triangle list. Everything is read-only after
//! construction; refinement operations return a new point array which must be triangulated
//! again to obtain the refined mesh.
//!
//! All public indices and coordinates are expressed in the caller's point order. The stored
//! permutation translates to and from the engine's insertion order internally.

use hashbrown::{HashMap, HashSet};
use log::warn;

use crate::adjacency::Adjacency;
use crate::delaunay;
use crate::error::{EngineError, TriangulationError};
use crate::permutation::Permutation;
use crate::spatial::KdTree;
use crate::surface::{
    self, Convergence, GradientEstimate, Interpolation, InterpolationOrder, PointLocation,
    Smoothed, SmoothingStatus,
};
use crate::types::{Float, Segment, TriangleId, Vertex, VertexId};
use crate::utils::{barycentric, signed_area, triplet_orientation, Orientation};

/// Maximum number of re-permutation attempts when the candidate seed points are collinear
pub const MAX_SEED_ATTEMPTS: usize = 5;

/// Iteration count used when cubic interpolation estimates its own gradients
pub const DEFAULT_GRADIENT_ITERATIONS: usize = 3;
/// Tolerance used when cubic interpolation estimates its own gradients
pub const DEFAULT_GRADIENT_TOLERANCE: Float = 1e-3;
/// Default ratio for trisection refinement
pub const DEFAULT_TRISECTION_RATIO: Float = 1. / 3.;

#[derive(Clone, Debug)]
pub struct TriangulationConfiguration {
    /// Randomizes the order in which the points are handed to the engine. Improves the expected
    /// insertion complexity for adversarially ordered inputs and works around collinear leading
    /// points: construction re-permutes up to [`MAX_SEED_ATTEMPTS`] times when the candidate
    /// seed points are collinear. The caller-facing point order is unaffected.
    pub permute: bool,
    /// Number of uniform midpoint refinement and rebuild cycles applied at construction
    pub refinement_levels: usize,
    /// Build a k-d tree over the points to serve [`Triangulation::nearest_vertices`] queries
    pub build_tree: bool,
}

impl Default for TriangulationConfiguration {
    fn default() -> Self {
        Self {
            permute: false,
            refinement_levels: 0,
            build_tree: false,
        }
    }
}

/// Point-insertion strategy for uniform refinement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Refinement {
    /// Insert the midpoint of every segment
    Midpoints,
    /// Insert both trisection points of every segment, at `ratio` and `1 - ratio`
    /// ([`DEFAULT_TRISECTION_RATIO`] is the conventional choice)
    Trisection { ratio: Float },
    /// Insert the centroid of every triangle
    Centroids,
}

pub struct Triangulation {
    /// Point coordinates, in engine order
    points: Vec<Vertex>,
    permutation: Permutation,
    adjacency: Adjacency,
    /// Triangle list in engine index space; counter-clockwise, strictly positive area
    triangles: Vec<[VertexId; 3]>,
    tree: Option<KdTree>,
}

impl Triangulation {
    /// Builds the Delaunay triangulation of `points`.
    ///
    /// The first three points handed to the engine must not be collinear; with
    /// `configuration.permute` enabled a collinear seed is retried with a fresh permutation,
    /// otherwise it fails with [`TriangulationError::DegenerateInput`].
    pub fn new(
        points: &[Vertex],
        configuration: TriangulationConfiguration,
    ) -> Result<Self, TriangulationError> {
        let mut triangulation = Self::build(points, &configuration)?;
        for _ in 0..configuration.refinement_levels {
            let refined = triangulation.uniformly_refine_triangulation(Refinement::Midpoints);
            triangulation = Self::build(&refined, &configuration)?;
        }
        Ok(triangulation)
    }

    fn build(
        points: &[Vertex],
        configuration: &TriangulationConfiguration,
    ) -> Result<Self, TriangulationError> {
        if points.len() < 3 {
            return Err(TriangulationError::degenerate(
                "at least three points are required",
            ));
        }

        let (permutation, shuffled) = if configuration.permute {
            let mut rng = rand::thread_rng();
            let mut attempt = 0;
            loop {
                let candidate = Permutation::random(points.len(), &mut rng);
                let shuffled = candidate.shuffle(points);
                if triplet_orientation(shuffled[0], shuffled[1], shuffled[2])
                    != Orientation::Colinear
                {
                    break (candidate, shuffled);
                }
                attempt += 1;
                if attempt >= MAX_SEED_ATTEMPTS {
                    return Err(TriangulationError::degenerate(format!(
                        "no non-collinear seed found after {} permutations",
                        MAX_SEED_ATTEMPTS
                    )));
                }
            }
        } else {
            (Permutation::identity(points.len()), points.to_vec())
        };

        let adjacency = match delaunay::triangulate(&shuffled) {
            Ok(adjacency) => adjacency,
            Err(engine_error) => return Err(map_engine_error(engine_error, &permutation)),
        };

        let mut triangles = adjacency.triangle_list();
        // Degenerate engine artifacts, not real faces
        triangles.retain(|&[a, b, c]| signed_area(shuffled[a], shuffled[b], shuffled[c]) > 0.);

        let tree = if configuration.build_tree {
            Some(KdTree::build(points))
        } else {
            None
        };

        Ok(Self {
            points: shuffled,
            permutation,
            adjacency,
            triangles,
            tree,
        })
    }

    #[inline]
    pub fn npoints(&self) -> usize {
        self.points.len()
    }

    /// Point coordinates, in the caller's original order.
    pub fn points(&self) -> Vec<Vertex> {
        self.permutation.deshuffle(&self.points)
    }

    /// x coordinates, in the caller's original order.
    pub fn x(&self) -> Vec<Float> {
        self.points().iter().map(|point| point.x).collect()
    }

    /// y coordinates, in the caller's original order.
    pub fn y(&self) -> Vec<Float> {
        self.points().iter().map(|point| point.y).collect()
    }

    /// Triangles of the mesh as vertex index triples, counter-clockwise oriented.
    pub fn simplices(&self) -> Vec<[VertexId; 3]> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                [
                    self.permutation.to_user_index(a),
                    self.permutation.to_user_index(b),
                    self.permutation.to_user_index(c),
                ]
            })
            .collect()
    }

    /// The adjacency structure backing this triangulation. Node indices inside it are in engine
    /// order.
    #[inline]
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Signed area of each triangle. Strictly positive by construction.
    pub fn areas(&self) -> Vec<Float> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| signed_area(self.points[a], self.points[b], self.points[c]))
            .collect()
    }

    /// Edge lengths (|ab|, |bc|, |ca|) of each triangle.
    pub fn edge_lengths(&self) -> Vec<[Float; 3]> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                [
                    self.points[a].distance(self.points[b]),
                    self.points[b].distance(self.points[c]),
                    self.points[c].distance(self.points[a]),
                ]
            })
            .collect()
    }

    /// Vertices of the convex hull, in counter-clockwise order around the boundary.
    pub fn convex_hull(&self) -> Vec<VertexId> {
        self.adjacency
            .boundary_nodes()
            .into_iter()
            .map(|node| self.permutation.to_user_index(node))
            .collect()
    }

    /// Index of the triangle containing each query point, `None` for points outside the convex
    /// hull.
    ///
    /// The indices refer to rows of [`Triangulation::simplices`].
    pub fn containing_triangle(&self, queries: &[Vertex]) -> Vec<Option<TriangleId>> {
        let lookup: HashMap<[VertexId; 3], TriangleId> = self
            .triangles
            .iter()
            .enumerate()
            .map(|(index, &triangle)| {
                let mut sorted = triangle;
                sorted.sort_unstable();
                (sorted, index)
            })
            .collect();

        queries
            .iter()
            .map(|&query| {
                let seed = self.closest_x_node(query.x);
                self.adjacency
                    .locate(&self.points, query, seed)
                    .and_then(|mut triangle| {
                        triangle.sort_unstable();
                        lookup.get(&triangle).copied()
                    })
            })
            .collect()
    }

    /// Vertices of the triangle containing each query point together with the normalized
    /// barycentric coordinates of the query inside it; `None` outside the hull.
    ///
    /// The vertex triple loops around the containing triangle but may start at a different
    /// corner than the corresponding [`Triangulation::simplices`] row.
    pub fn containing_simplex_and_bcc(
        &self,
        queries: &[Vertex],
    ) -> Vec<Option<([VertexId; 3], [Float; 3])>> {
        queries
            .iter()
            .map(|&query| {
                let seed = self.closest_x_node(query.x);
                self.adjacency
                    .locate(&self.points, query, seed)
                    .map(|[a, b, c]| {
                        let bcc =
                            barycentric(self.points[a], self.points[b], self.points[c], query);
                        (
                            [
                                self.permutation.to_user_index(a),
                                self.permutation.to_user_index(b),
                                self.permutation.to_user_index(c),
                            ],
                            bcc,
                        )
                    })
            })
            .collect()
    }

    /// Nearest mesh vertex to each query point, with the squared Euclidean distance to it.
    pub fn nearest_vertex(&self, queries: &[Vertex]) -> Vec<(VertexId, Float)> {
        queries
            .iter()
            .map(|&query| {
                let seed = self.closest_x_node(query.x);
                let (node, dist) = self.adjacency.nearest_node(&self.points, query, seed);
                (self.permutation.to_user_index(node), dist)
            })
            .collect()
    }

    /// Neighbour vertices of `vertex` in the triangulation, ascending.
    pub fn vertex_neighbours(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut neighbours = HashSet::new();
        for row in self.simplices() {
            if row.contains(&vertex) {
                for member in row {
                    if member != vertex {
                        neighbours.insert(member);
                    }
                }
            }
        }
        let mut result: Vec<VertexId> = neighbours.into_iter().collect();
        result.sort_unstable();
        result
    }

    /// Indices of all triangles owning any of the given vertices, ascending.
    pub fn vertex_triangles(&self, vertices: &[VertexId]) -> Vec<TriangleId> {
        let simplices = self.simplices();
        let mut triangles = HashSet::new();
        for &vertex in vertices {
            for (index, row) in simplices.iter().enumerate() {
                if row.contains(&vertex) {
                    triangles.insert(index);
                }
            }
        }
        let mut result: Vec<TriangleId> = triangles.into_iter().collect();
        result.sort_unstable();
        result
    }

    /// All unique segments of the triangulation, in ascending lexicographic order.
    pub fn segments(&self) -> Vec<Segment> {
        let mut set = HashSet::new();
        for row in self.simplices() {
            set.insert(Segment::new(row[0], row[1]));
            set.insert(Segment::new(row[1], row[2]));
            set.insert(Segment::new(row[0], row[2]));
        }
        let mut result: Vec<Segment> = set.into_iter().collect();
        result.sort_unstable();
        result
    }

    /// For each triangle, the indices of its neighbour triangles. The kth neighbour lies
    /// opposite the kth vertex; `None` marks a hull edge.
    pub fn neighbour_simplices(&self) -> Vec<[Option<TriangleId>; 3]> {
        self.triangle_topology().0
    }

    /// Neighbour triangles as in [`Triangulation::neighbour_simplices`], together with the arc
    /// index of each triangle edge. Arc indices refer to entries of
    /// [`Triangulation::segments`]; the kth arc lies opposite the kth vertex.
    pub fn neighbour_and_arc_simplices(
        &self,
    ) -> (Vec<[Option<TriangleId>; 3]>, Vec<[usize; 3]>) {
        self.triangle_topology()
    }

    fn triangle_topology(&self) -> (Vec<[Option<TriangleId>; 3]>, Vec<[usize; 3]>) {
        let simplices = self.simplices();
        let segments = self.segments();
        let arc_index: HashMap<Segment, usize> = segments
            .iter()
            .enumerate()
            .map(|(index, &segment)| (segment, index))
            .collect();

        let mut edge_triangles: HashMap<Segment, Vec<TriangleId>> = HashMap::new();
        for (index, row) in simplices.iter().enumerate() {
            for k in 0..3 {
                let segment = Segment::new(row[(k + 1) % 3], row[(k + 2) % 3]);
                edge_triangles.entry(segment).or_default().push(index);
            }
        }

        let mut neighbours = Vec::with_capacity(simplices.len());
        let mut arcs = Vec::with_capacity(simplices.len());
        for (index, row) in simplices.iter().enumerate() {
            let mut row_neighbours = [None; 3];
            let mut row_arcs = [0; 3];
            for k in 0..3 {
                let segment = Segment::new(row[(k + 1) % 3], row[(k + 2) % 3]);
                row_arcs[k] = arc_index[&segment];
                row_neighbours[k] = edge_triangles[&segment]
                    .iter()
                    .copied()
                    .find(|&other| other != index);
            }
            neighbours.push(row_neighbours);
            arcs.push(row_arcs);
        }
        (neighbours, arcs)
    }

    /// Centroid of every triangle.
    pub fn face_midpoints(&self) -> Vec<Vertex> {
        let all: Vec<TriangleId> = (0..self.triangles.len()).collect();
        self.face_midpoints_for(&all)
    }

    /// Centroids of the given triangles.
    pub fn face_midpoints_for(&self, triangles: &[TriangleId]) -> Vec<Vertex> {
        let points = self.points();
        let simplices = self.simplices();
        triangles
            .iter()
            .map(|&triangle| {
                let [a, b, c] = simplices[triangle];
                (points[a] + points[b] + points[c]) / 3.
            })
            .collect()
    }

    /// Midpoint of every segment.
    pub fn segment_midpoints(&self) -> Vec<Vertex> {
        self.segment_midpoints_for(&self.segments())
    }

    /// Midpoints of the given segments.
    ///
    /// Segments must not repeat: a duplicate midpoint makes the re-triangulation of the
    /// augmented point set fail with [`TriangulationError::DuplicateNode`]. The canonical
    /// [`Segment`] ordering makes (n1, n2) and (n2, n1) the same segment.
    pub fn segment_midpoints_for(&self, segments: &[Segment]) -> Vec<Vertex> {
        let points = self.points();
        segments
            .iter()
            .map(|segment| (points[segment.n1] + points[segment.n2]) * 0.5)
            .collect()
    }

    /// Midpoints of every segment connected to any of the given vertices.
    pub fn segment_midpoints_by_vertices(&self, vertices: &[VertexId]) -> Vec<Vertex> {
        let mut set = HashSet::new();
        for &vertex in vertices {
            for neighbour in self.vertex_neighbours(vertex) {
                set.insert(Segment::new(vertex, neighbour));
            }
        }
        let mut segments: Vec<Segment> = set.into_iter().collect();
        segments.sort_unstable();
        self.segment_midpoints_for(&segments)
    }

    /// Both trisection points of every segment, at `ratio` and `1 - ratio` along it.
    pub fn segment_tripoints(&self, ratio: Float) -> Vec<Vertex> {
        let points = self.points();
        let segments = self.segments();
        let mut result = Vec::with_capacity(2 * segments.len());
        for segment in &segments {
            result.push(ratio * points[segment.n1] + (1. - ratio) * points[segment.n2]);
        }
        for segment in &segments {
            result.push((1. - ratio) * points[segment.n1] + ratio * points[segment.n2]);
        }
        result
    }

    /// Returns the current points followed by the points inserted by the chosen refinement.
    /// Triangulate the result to obtain the refined mesh.
    pub fn uniformly_refine_triangulation(&self, refinement: Refinement) -> Vec<Vertex> {
        let inserted = match refinement {
            Refinement::Midpoints => self.segment_midpoints(),
            Refinement::Trisection { ratio } => self.segment_tripoints(ratio),
            Refinement::Centroids => self.face_midpoints(),
        };
        self.augmented(inserted)
    }

    /// Bisects every segment connected to any of the given vertices.
    pub fn midpoint_refine_triangulation_by_vertices(
        &self,
        vertices: &[VertexId],
    ) -> Vec<Vertex> {
        self.augmented(self.segment_midpoints_by_vertices(vertices))
    }

    /// Bisects every edge of the given triangles. Edges shared between selected triangles are
    /// bisected once.
    pub fn edge_refine_triangulation_by_triangles(
        &self,
        triangles: &[TriangleId],
    ) -> Vec<Vertex> {
        let simplices = self.simplices();
        let mut set = HashSet::new();
        for &triangle in triangles {
            let row = simplices[triangle];
            set.insert(Segment::new(row[0], row[1]));
            set.insert(Segment::new(row[1], row[2]));
            set.insert(Segment::new(row[0], row[2]));
        }
        let mut segments: Vec<Segment> = set.into_iter().collect();
        segments.sort_unstable();
        self.augmented(self.segment_midpoints_for(&segments))
    }

    /// Bisects every edge of every triangle owning any of the given vertices.
    pub fn edge_refine_triangulation_by_vertices(&self, vertices: &[VertexId]) -> Vec<Vertex> {
        self.edge_refine_triangulation_by_triangles(&self.vertex_triangles(vertices))
    }

    /// Inserts the centroids of the given triangles.
    pub fn centroid_refine_triangulation_by_triangles(
        &self,
        triangles: &[TriangleId],
    ) -> Vec<Vertex> {
        let mut unique: Vec<TriangleId> = triangles.to_vec();
        unique.sort_unstable();
        unique.dedup();
        self.augmented(self.face_midpoints_for(&unique))
    }

    /// Inserts the centroids of every triangle owning any of the given vertices.
    pub fn centroid_refine_triangulation_by_vertices(
        &self,
        vertices: &[VertexId],
    ) -> Vec<Vertex> {
        self.centroid_refine_triangulation_by_triangles(&self.vertex_triangles(vertices))
    }

    /// Concatenates this triangulation's points with another's. Unless the caller asserts with
    /// `unique` that the two sets share no point, identical rows are removed (exact equality).
    pub fn join(&self, other: &Triangulation, unique: bool) -> Vec<Vertex> {
        let mut points = self.points();
        points.extend(other.points());
        if !unique {
            points = remove_duplicates(&points);
        }
        points
    }

    fn augmented(&self, inserted: Vec<Vertex>) -> Vec<Vertex> {
        let mut points = self.points();
        points.extend(inserted);
        points
    }

    /// Engine-order index of the vertex whose x coordinate is closest to `x`. Used to seed the
    /// engine walks.
    fn closest_x_node(&self, x: Float) -> VertexId {
        let mut best = 0;
        let mut best_dist = Float::MAX;
        for (index, point) in self.points.iter().enumerate() {
            let dist = (point.x - x).abs();
            if dist < best_dist {
                best = index;
                best_dist = dist;
            }
        }
        best
    }

    fn check_field_size(&self, len: usize, name: &str) -> Result<(), TriangulationError> {
        if len != self.points.len() {
            return Err(TriangulationError::invalid_input(format!(
                "{} has length {}, expected one entry per mesh point ({})",
                name,
                len,
                self.points.len()
            )));
        }
        Ok(())
    }

    /// Estimates the gradient of the nodal field `values` by minimizing the linearized
    /// curvature of the interpolatory surface along the triangulation arcs.
    ///
    /// `nit` bounds the relaxation sweeps, `tol` is the largest acceptable gradient change in
    /// the final sweep. Falling short of the tolerance is reported through
    /// [`GradientEstimate::convergence`], with the partial result still returned.
    pub fn gradient(
        &self,
        values: &[Float],
        nit: usize,
        tol: Float,
    ) -> Result<GradientEstimate, TriangulationError> {
        self.check_field_size(values.len(), "values")?;
        if nit == 0 {
            return Err(TriangulationError::invalid_input("nit must be at least 1"));
        }

        let shuffled = self.permutation.shuffle(values);
        let (gradients, convergence) =
            surface::estimate_gradients(&self.adjacency, &self.points, &shuffled, nit, tol);
        if let Convergence::ToleranceNotMet { residual } = convergence {
            warn!(
                "gradient estimation stopped at residual {} before reaching tolerance {}",
                residual, tol
            );
        }

        let dfdx: Vec<Float> = gradients.iter().map(|gradient| gradient.x).collect();
        let dfdy: Vec<Float> = gradients.iter().map(|gradient| gradient.y).collect();
        Ok(GradientEstimate {
            dfdx: self.permutation.deshuffle(&dfdx),
            dfdy: self.permutation.deshuffle(&dfdy),
            convergence,
        })
    }

    /// Gradient of the nodal field `values` at a single vertex, from a local least-squares fit
    /// of its neighbourhood.
    pub fn gradient_local(
        &self,
        values: &[Float],
        vertex: VertexId,
    ) -> Result<(Float, Float), TriangulationError> {
        self.check_field_size(values.len(), "values")?;
        if vertex >= self.points.len() {
            return Err(TriangulationError::invalid_input(format!(
                "vertex {} out of range ({} points)",
                vertex,
                self.points.len()
            )));
        }

        let shuffled = self.permutation.shuffle(values);
        let gradient = surface::gradient_at_node(
            &self.adjacency,
            &self.points,
            &shuffled,
            self.permutation.to_engine_index(vertex),
        );
        Ok((gradient.x, gradient.y))
    }

    /// Smooths the nodal field `values` by minimizing surface curvature subject to the bound
    /// `sum(weights[i] * (f[i] - values[i])²) <= sm`, with `smtol` the relative tolerance on
    /// the bound and `gstol` the convergence tolerance.
    ///
    /// More appropriate than interpolation when significant errors are present in the data;
    /// `weights[i] = 1/sigma_i²` is a good rule of thumb. A loose bound is reported through
    /// [`Smoothed::status`] as a warning, not a failure.
    pub fn smoothing(
        &self,
        values: &[Float],
        weights: &[Float],
        sm: Float,
        smtol: Float,
        gstol: Float,
    ) -> Result<Smoothed, TriangulationError> {
        self.check_field_size(values.len(), "values")?;
        self.check_field_size(weights.len(), "weights")?;
        if weights.iter().any(|&weight| weight <= 0.) {
            return Err(TriangulationError::invalid_input("weights must be positive"));
        }
        if sm <= 0. {
            return Err(TriangulationError::invalid_input("sm must be positive"));
        }
        if !(0. ..=1.).contains(&smtol) {
            return Err(TriangulationError::invalid_input("smtol must lie in [0, 1]"));
        }
        if gstol <= 0. {
            return Err(TriangulationError::invalid_input("gstol must be positive"));
        }

        let shuffled_values = self.permutation.shuffle(values);
        let shuffled_weights = self.permutation.shuffle(weights);
        let (smoothed, gradients, status) = surface::smooth(
            &self.adjacency,
            &self.points,
            &shuffled_values,
            &shuffled_weights,
            sm,
            smtol,
            gstol,
        );
        match status {
            SmoothingStatus::ConstraintInactive => warn!(
                "smoothing deviation bound is not active; the result minimizes curvature with slack deviation"
            ),
            SmoothingStatus::ToleranceNotMet { residual } => warn!(
                "smoothing stopped {} away from the deviation bound",
                residual
            ),
            SmoothingStatus::ConstraintActive => (),
        }

        let dfdx: Vec<Float> = gradients.iter().map(|gradient| gradient.x).collect();
        let dfdy: Vec<Float> = gradients.iter().map(|gradient| gradient.y).collect();
        Ok(Smoothed {
            values: self.permutation.deshuffle(&smoothed),
            dfdx: self.permutation.deshuffle(&dfdx),
            dfdy: self.permutation.deshuffle(&dfdy),
            status,
        })
    }

    /// Interpolates the nodal field `values` at the query points with the requested order.
    pub fn interpolate(
        &self,
        queries: &[Vertex],
        values: &[Float],
        order: InterpolationOrder,
    ) -> Result<Interpolation, TriangulationError> {
        match order {
            InterpolationOrder::Nearest => self.interpolate_nearest(queries, values),
            InterpolationOrder::Linear => self.interpolate_linear(queries, values),
            InterpolationOrder::Cubic => self.interpolate_cubic(queries, values, None),
        }
    }

    /// Nearest-neighbour interpolation. Each query takes the value of its closest mesh vertex;
    /// the location field reports whether the query fell inside the convex hull.
    pub fn interpolate_nearest(
        &self,
        queries: &[Vertex],
        values: &[Float],
    ) -> Result<Interpolation, TriangulationError> {
        self.check_field_size(values.len(), "values")?;

        let shuffled = self.permutation.shuffle(values);
        let user_points = self.points();
        let hull_points: Vec<Vertex> = self
            .convex_hull()
            .into_iter()
            .map(|vertex| user_points[vertex])
            .collect();

        let mut out_values = Vec::with_capacity(queries.len());
        let mut locations = Vec::with_capacity(queries.len());
        for &query in queries {
            let seed = self.closest_x_node(query.x);
            let (node, _) = self.adjacency.nearest_node(&self.points, query, seed);
            out_values.push(shuffled[node]);
            locations.push(hull_side(&hull_points, query));
        }
        Ok(Interpolation {
            values: out_values,
            locations,
            derivatives: None,
        })
    }

    /// Piecewise linear interpolation, `C0` continuous. Queries outside the hull evaluate the
    /// linear field at their projection onto the hull boundary.
    pub fn interpolate_linear(
        &self,
        queries: &[Vertex],
        values: &[Float],
    ) -> Result<Interpolation, TriangulationError> {
        self.check_field_size(values.len(), "values")?;

        let shuffled = self.permutation.shuffle(values);
        let mut out_values = Vec::with_capacity(queries.len());
        let mut locations = Vec::with_capacity(queries.len());
        for &query in queries {
            let seed = self.closest_x_node(query.x);
            let (value, location) =
                surface::interpolate_linear_at(&self.adjacency, &self.points, &shuffled, query, seed);
            out_values.push(value);
            locations.push(location);
        }
        Ok(Interpolation {
            values: out_values,
            locations,
            derivatives: None,
        })
    }

    /// Piecewise cubic interpolation from nodal values and gradients, with first derivatives
    /// returned at the query points.
    ///
    /// When `gradients` is `None` the nodal gradients are estimated with
    /// [`Triangulation::gradient`] defaults. Queries outside the hull evaluate at their
    /// projection onto the hull boundary.
    pub fn interpolate_cubic(
        &self,
        queries: &[Vertex],
        values: &[Float],
        gradients: Option<(&[Float], &[Float])>,
    ) -> Result<Interpolation, TriangulationError> {
        self.check_field_size(values.len(), "values")?;

        let shuffled = self.permutation.shuffle(values);
        let nodal_gradients: Vec<Vertex> = match gradients {
            Some((dfdx, dfdy)) => {
                self.check_field_size(dfdx.len(), "dfdx")?;
                self.check_field_size(dfdy.len(), "dfdy")?;
                let gx = self.permutation.shuffle(dfdx);
                let gy = self.permutation.shuffle(dfdy);
                gx.iter()
                    .zip(gy.iter())
                    .map(|(&x, &y)| Vertex::new(x, y))
                    .collect()
            }
            None => {
                surface::estimate_gradients(
                    &self.adjacency,
                    &self.points,
                    &shuffled,
                    DEFAULT_GRADIENT_ITERATIONS,
                    DEFAULT_GRADIENT_TOLERANCE,
                )
                .0
            }
        };

        let mut out_values = Vec::with_capacity(queries.len());
        let mut locations = Vec::with_capacity(queries.len());
        let mut dzx = Vec::with_capacity(queries.len());
        let mut dzy = Vec::with_capacity(queries.len());
        for &query in queries {
            let seed = self.closest_x_node(query.x);
            let (value, gradient, location) = surface::interpolate_cubic_at(
                &self.adjacency,
                &self.points,
                &shuffled,
                &nodal_gradients,
                query,
                seed,
            );
            out_values.push(value);
            locations.push(location);
            dzx.push(gradient.x);
            dzy.push(gradient.y);
        }
        Ok(Interpolation {
            values: out_values,
            locations,
            derivatives: Some((dzx, dzy)),
        })
    }

    /// k-nearest-vertex lookup through the k-d tree built at construction time.
    ///
    /// Returns `None` when the triangulation was built without a tree
    /// (see [`TriangulationConfiguration::build_tree`]); this is the documented sentinel, not a
    /// failure. Distances are Euclidean (not squared), ascending per query.
    pub fn nearest_vertices(
        &self,
        queries: &[Vertex],
        k: usize,
        max_distance: Float,
    ) -> Option<(Vec<Vec<Float>>, Vec<Vec<VertexId>>)> {
        let tree = self.tree.as_ref()?;
        let mut distances = Vec::with_capacity(queries.len());
        let mut indices = Vec::with_capacity(queries.len());
        for &query in queries {
            let found = tree.query(query, k, max_distance);
            distances.push(found.iter().map(|entry| entry.0).collect());
            indices.push(found.iter().map(|entry| entry.1).collect());
        }
        Some((distances, indices))
    }
}

/// Classification of `q` against the counter-clockwise hull polygon: outside as soon as it lies
/// strictly on the right of some hull edge. A point exactly on an edge (det == 0) counts as
/// inside.
fn hull_side(hull_points: &[Vertex], q: Vertex) -> PointLocation {
    for i in 0..hull_points.len() {
        let a = hull_points[i];
        let b = hull_points[(i + 1) % hull_points.len()];
        let det = (b.x - a.x) * (q.y - a.y) - (b.y - a.y) * (q.x - a.x);
        if det < 0. {
            return PointLocation::Outside;
        }
    }
    PointLocation::Inside
}

/// Removes duplicate rows from a point array. Duplicates are detected by exact floating-point
/// equality, no tolerance is applied; the result is in ascending lexicographic (x, y) order.
pub fn remove_duplicates(points: &[Vertex]) -> Vec<Vertex> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    sorted
}

fn map_engine_error(error: EngineError, permutation: &Permutation) -> TriangulationError {
    match error {
        EngineError::TooFewPoints | EngineError::CollinearSeed => {
            TriangulationError::degenerate(error.to_string())
        }
        EngineError::CoincidentNodes { first, second } => {
            let first = permutation.to_user_index(first);
            let second = permutation.to_user_index(second);
            TriangulationError::DuplicateNode {
                first: first.min(second),
                second: first.max(second),
            }
        }
        EngineError::Inconsistent(reason) => TriangulationError::EngineInternal { reason },
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
