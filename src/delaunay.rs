//! Built-in triangulation engine: incremental insertion into a container triangle with
//! circumcircle edge-swap legalization.
//!
//! The engine works on a normalized copy of the input coordinates and only outputs topology:
//! the adjacency structure of the final triangulation (see [`crate::adjacency`]).

use arrayvec::ArrayVec;
use log::error;

#[cfg(feature = "parallel_filtering")]
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

#[cfg(feature = "progress_log")]
use log::info;

#[cfg(feature = "profile_traces")]
use tracing::{span, Level};

use crate::adjacency::Adjacency;
use crate::error::EngineError;
use crate::types::{
    opposite_edge_index, Float, Neighbor, Quad, QuadVertices, TriangleData, TriangleId,
    TriangleVertexIndex, Triangles, Vertex, VertexId, EDGE_TO_VERTS, VERT_1, VERT_2, VERT_3,
};
use crate::utils::{
    is_point_on_right_side_of_edge, is_vertex_in_triangle_circumcircle, line_slope, signed_area,
    triplet_orientation, Orientation,
};

/// Binsort will cover the region to be triangulated by a rectangular grid so that each bin
/// contains roughly N^(density_power) points.
pub const DEFAULT_BIN_VERTEX_DENSITY_POWER: f64 = 0.5;

pub const FILTER_PARALLEL_TRI_COUNT_THRESHOLD: usize = 100_000;
pub const FILTER_PARALLEL_MIN_BATCH_LEN: usize = 1000;

pub const CONTAINER_TRIANGLE_COORDINATE: Float = 5.;

/// Coordinates of the container triangle vertices, in normalized space. The container vertices
/// are treated as infinitely far away by the swap test, their coordinates only matter to the
/// insertion walk.
pub const CONTAINER_TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new(
        -CONTAINER_TRIANGLE_COORDINATE,
        -CONTAINER_TRIANGLE_COORDINATE,
    ),
    Vertex::new(0., CONTAINER_TRIANGLE_COORDINATE),
    Vertex::new(
        CONTAINER_TRIANGLE_COORDINATE,
        -CONTAINER_TRIANGLE_COORDINATE,
    ),
];

/// Triangulates the given points and returns the adjacency structure of the Delaunay
/// triangulation.
///
/// Contract on the input:
/// - at least three points,
/// - the first three points must not be collinear (reorder or permute the input otherwise),
/// - no two points may coincide.
pub fn triangulate(points: &[Vertex]) -> Result<Adjacency, EngineError> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "triangulate").entered();

    if points.len() < 3 {
        return Err(EngineError::TooFewPoints);
    }
    if triplet_orientation(points[0], points[1], points[2]) == Orientation::Colinear {
        return Err(EngineError::CollinearSeed);
    }

    // Uniformly scale the coordinates of the points so that they all lie between 0 and 1.
    let mut normalized_vertices = normalize_vertices_coordinates(points)?;

    // Sort points into bins. Cover the region to be triangulated by a rectangular grid so that
    // each bin contains roughly N^(1/2) points. Label the bins so that consecutive bins are
    // adjacent to one another, and then allocate each point to its appropriate bin. Sort the
    // list of points in ascending sequence of their bin numbers so that consecutive points are
    // grouped together in the x-y plane.
    let partitioned_vertices =
        VertexBinSort::sort(&normalized_vertices, DEFAULT_BIN_VERTEX_DENSITY_POWER);

    let (container_triangle, min_container_vertex_id) =
        add_container_triangle_vertices(&mut normalized_vertices);

    let mut triangles = Triangles::with_capacity(normalized_vertices.len() * 2 + 1);
    triangles.push(container_triangle);

    // Id of the triangle we are looking at
    let mut triangle_id: Neighbor = Some(0);

    // This buffer is used by all calls to `restore_delaunay_triangulation`.
    // We create it here to share the allocation between all those calls.
    let mut quads_to_check = Vec::new();

    // Loop over all the input vertices
    for (_index, &vertex_id) in partitioned_vertices.iter().enumerate() {
        // Find an existing triangle which encloses P
        let vertex = normalized_vertices[vertex_id];
        match search_enclosing_triangle(vertex, triangle_id, &triangles, &normalized_vertices) {
            SearchResult::EnclosingTriangle(enclosing_triangle_id) => {
                // Compare to the points in the triangle, reject the input on a coincidence
                let triangle = triangles.get(enclosing_triangle_id);
                let triangle_verts = triangle.to_vertices_array(&normalized_vertices);
                if let Some(existing_vertex_id) =
                    find_existing_close_vertex(triangle, &triangle_verts, vertex)
                {
                    return Err(EngineError::CoincidentNodes {
                        first: existing_vertex_id,
                        second: vertex_id,
                    });
                }

                // Form three new triangles by connecting P to each of the enclosing triangle's
                // vertices.
                let new_triangles =
                    split_triangle_in_three_at_vertex(&mut triangles, enclosing_triangle_id, vertex_id);

                restore_delaunay_triangulation(
                    &mut triangles,
                    &normalized_vertices,
                    min_container_vertex_id,
                    vertex_id,
                    new_triangles,
                    &mut quads_to_check,
                );

                // We'll start the search for the next enclosing triangle from the last created
                // triangle. This is a pretty good heuristic since the vertices were spatially
                // partitioned
                triangle_id = Some(triangles.last_id());

                #[cfg(feature = "progress_log")]
                {
                    if _index % ((partitioned_vertices.len() / 50) + 1) == 0 {
                        let progress = 100. * _index as f32 / partitioned_vertices.len() as f32;
                        info!(
                            "Triangulation progress, {}%: {}/{}",
                            progress,
                            _index,
                            partitioned_vertices.len()
                        );
                    }
                }
            }
            SearchResult::NotFound => {
                error!("found no triangle enclosing vertex {}", vertex_id);
                return Err(EngineError::Inconsistent(format!(
                    "no triangle encloses vertex {}",
                    vertex_id
                )));
            }
        }
    }

    let finite_triangles = filter_container_triangles(
        &triangles,
        min_container_vertex_id,
        &normalized_vertices[..min_container_vertex_id],
    );
    if finite_triangles.is_empty() {
        return Err(EngineError::Inconsistent(
            "triangulation produced no finite triangles".to_string(),
        ));
    }

    Adjacency::from_triangles(
        min_container_vertex_id,
        &normalized_vertices[..min_container_vertex_id],
        &finite_triangles,
    )
}

/// This scaling ensures that all of the coordinates are between 0 and 1 but does not modify the
/// relative positions of the points in the x-y plane. The use of normalized coordinates, although
/// not essential, reduces the effects of roundoff error and is also convenient from a
/// computational point of view.
pub(crate) fn normalize_vertices_coordinates(
    vertices: &[Vertex],
) -> Result<Vec<Vertex>, EngineError> {
    let (mut x_min, mut y_min, mut x_max, mut y_max) =
        (Float::MAX, Float::MAX, Float::MIN, Float::MIN);

    for vertex in vertices.iter() {
        if vertex.x < x_min {
            x_min = vertex.x;
        }
        if vertex.x > x_max {
            x_max = vertex.x;
        }
        if vertex.y < y_min {
            y_min = vertex.y;
        }
        if vertex.y > y_max {
            y_max = vertex.y;
        }
    }

    let scale_factor = (x_max - x_min).max(y_max - y_min);
    if scale_factor == 0. {
        // Zero extent in both directions: every point coincides with the first one
        return Err(EngineError::CoincidentNodes {
            first: 0,
            second: 1,
        });
    }

    Ok(vertices
        .iter()
        .map(|vertex| Vertex {
            x: (vertex.x - x_min) / scale_factor,
            y: (vertex.y - y_min) / scale_factor,
        })
        .collect())
}

/// Select three dummy points to form a container triangle that completely encompasses all of the
/// points to be triangulated. This container initially defines a triangulation comprised of a
/// single triangle. Its vertices are defined in terms of normalized coordinates and are located
/// at a considerable distance from the window which encloses the set of points.
pub(crate) fn add_container_triangle_vertices(
    vertices: &mut Vec<Vertex>,
) -> (TriangleData, VertexId) {
    let min_container_vertex_id = vertices.len();
    let container_triangle = TriangleData::new_container_triangle(min_container_vertex_id);
    vertices.extend(CONTAINER_TRIANGLE_VERTICES);
    (container_triangle, min_container_vertex_id)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SearchResult {
    EnclosingTriangle(TriangleId),
    NotFound,
}

fn search_enclosing_triangle(
    vertex: Vertex,
    from: Neighbor,
    triangles: &Triangles,
    vertices: &[Vertex],
) -> SearchResult {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "search_enclosing_triangle").entered();

    let mut neighbor = from;

    let mut search_result = SearchResult::NotFound;
    // We use `triangles.count()` as an upper bound on the number of triangles
    for _ in 0..triangles.count() {
        let triangle_id = match neighbor {
            Some(id) => id,
            None => break,
        };
        let triangle = triangles.get(triangle_id);
        let (v1, v2, v3) = triangle.to_vertices(vertices);

        // Check if the point is inside the triangle, if not check the neighbors
        if !is_point_on_right_side_of_edge((v1, v2), vertex) {
            neighbor = triangle.neighbor12();
        } else if !is_point_on_right_side_of_edge((v2, v3), vertex) {
            neighbor = triangle.neighbor23();
        } else if !is_point_on_right_side_of_edge((v3, v1), vertex) {
            neighbor = triangle.neighbor31();
        } else {
            search_result = SearchResult::EnclosingTriangle(triangle_id);
            break;
        }
    }

    search_result
}

pub(crate) fn find_existing_close_vertex(
    triangle: &TriangleData,
    triangle_verts: &[Vertex; 3],
    vertex: Vertex,
) -> Option<VertexId> {
    for (vertex_index, triangle_vertex) in triangle_verts.iter().enumerate() {
        let dist = *triangle_vertex - vertex;
        if dist.x.abs() < Float::EPSILON && dist.y.abs() < Float::EPSILON {
            return Some(triangle.verts[vertex_index]);
        }
    }
    None
}

/// Splits `triangle_id` into 3 triangles (re-using the existing triangle id)
///
/// All the resulting triangles share `vertex_id` as their first vertex and keep the orientation
/// of the original triangle
///
/// ```text
///                  v1
///                / | \
///               / 3|2 \
///              /   |   \
///             /    |    \
///            / t1  |  t3 \
///           /     1|1     \
///          /      /1\      \
///         /     /     \     \
///        /    /         \    \
///       /   /             \   \
///      /2 /        t2       \ 3\
///     / / 3                 2 \ \
///   v3 ------------------------- v2
/// ```
pub(crate) fn split_triangle_in_three_at_vertex(
    triangles: &mut Triangles,
    triangle_id: TriangleId,
    vertex_id: VertexId,
) -> [TriangleId; 3] {
    // Re-use the existing triangle id for the first triangle
    let t1 = triangle_id;
    // Create two new triangles for the other two
    let t2 = triangles.next_id();
    let t3 = triangles.next_id() + 1;

    let split = triangles.get(t1).clone();

    // t2
    triangles.create(
        [vertex_id, split.v2(), split.v3()],
        [Some(t3), split.neighbor23(), Some(t1)],
    );
    // t3
    triangles.create(
        [vertex_id, split.v1(), split.v2()],
        [Some(t1), split.neighbor12(), Some(t2)],
    );

    // Update triangle indexes
    update_triangle_neighbor(split.neighbor12(), Some(t1), Some(t3), triangles);
    update_triangle_neighbor(split.neighbor23(), Some(t1), Some(t2), triangles);

    let triangle = triangles.get_mut(t1);
    triangle.verts = [vertex_id, split.v3(), split.v1()];
    triangle.neighbors = [Some(t2), split.neighbor31(), Some(t3)];

    [t1, t2, t3]
}

pub(crate) fn update_triangle_neighbor(
    triangle: Neighbor,
    old_neighbor_id: Neighbor,
    new_neighbor_id: Neighbor,
    triangles: &mut Triangles,
) {
    if let Some(triangle_id) = triangle {
        for neighbor in triangles.get_mut(triangle_id).neighbors.iter_mut() {
            if *neighbor == old_neighbor_id {
                *neighbor = new_neighbor_id;
                break;
            }
        }
    }
}

/// `quads_to_check` is the shared pre-allocated buffer.
/// - It does not need to be cleared since it is fully emptied by each call to
///   `restore_delaunay_triangulation`
fn restore_delaunay_triangulation(
    triangles: &mut Triangles,
    vertices: &[Vertex],
    min_container_vertex_id: VertexId,
    from_vertex_id: VertexId,
    new_triangles: [TriangleId; 3],
    quads_to_check: &mut Vec<(TriangleId, TriangleId)>,
) {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "restore_delaunay_triangulation").entered();

    for &from_triangle_id in &new_triangles {
        // EDGE_23 is the opposite edge of `from_vertex_id` in the 3 new triangles
        if let Some(neighbor) = triangles.get(from_triangle_id).neighbor23() {
            quads_to_check.push((from_triangle_id, neighbor));
        }
    }

    while let Some((from_triangle_id, opposite_triangle_id)) = quads_to_check.pop() {
        match check_and_swap_quad_diagonal(
            triangles,
            vertices,
            min_container_vertex_id,
            from_vertex_id,
            from_triangle_id,
            opposite_triangle_id,
        ) {
            QuadSwapResult::Swapped(quad_1, quad_2) => {
                // Place any new triangle pairs which are now opposite to `from_vertex_id` on the
                // stack, to be checked
                if let Some(neighbor) = quad_1.1 {
                    quads_to_check.push((quad_1.0, neighbor));
                }
                if let Some(neighbor) = quad_2.1 {
                    quads_to_check.push((quad_2.0, neighbor));
                }
            }
            QuadSwapResult::NotSwapped => (),
        }
    }
}

#[cold]
fn is_vertex_in_half_plane_1(
    infinite_vert: TriangleVertexIndex,
    quad_vertices: &QuadVertices,
) -> bool {
    // Test if q4 is inside the circle with 1 infinite point (half-plane defined by the 2 finite
    // points)
    let edge = opposite_edge_index(infinite_vert);
    let finite_vert_indexes = EDGE_TO_VERTS[edge];
    // q1q2q3 is in a CCW order, so we reverse the edge
    let edge_vertices = (
        quad_vertices.0[finite_vert_indexes[1]],
        quad_vertices.0[finite_vert_indexes[0]],
    );
    is_point_on_right_side_of_edge(edge_vertices, quad_vertices.q4())
}

#[cold]
fn is_vertex_in_half_plane_2(
    infinite_vert_1: TriangleVertexIndex,
    infinite_vert_2: TriangleVertexIndex,
    quad_vertices: &QuadVertices,
) -> bool {
    // Test if q4 is inside the circle with 2 infinite points (half-plane defined by the finite
    // point and the slope between the 2 infinite points)
    // Index of the finite vertex in q1q2q3
    let finite_vert_index = 3 - infinite_vert_1 - infinite_vert_2;
    let line_point = quad_vertices.0[finite_vert_index];
    let a = line_slope(
        quad_vertices.0[infinite_vert_1],
        quad_vertices.0[infinite_vert_2],
    );
    let b = line_point.y - a * line_point.x;
    // q1q2q3 is CCW
    // q1 q2 or q3 q1 => y > a.x + b
    // q2 q3 => y < a.x + b
    if infinite_vert_1 == VERT_2 && infinite_vert_2 == VERT_3 {
        quad_vertices.q4().y < a * quad_vertices.q4().x + b
    } else {
        quad_vertices.q4().y > a * quad_vertices.q4().x + b
    }
}

#[inline(always)]
pub(crate) fn should_swap_diagonals(
    quad: &Quad,
    vertices: &[Vertex],
    min_container_vertex_id: VertexId,
) -> bool {
    let quad_vertices = quad.to_vertices(vertices);
    let mut infinite_verts: ArrayVec<TriangleVertexIndex, 2> = ArrayVec::new();
    if quad.v1() >= min_container_vertex_id {
        infinite_verts.push(VERT_1);
    }
    if quad.v2() >= min_container_vertex_id {
        infinite_verts.push(VERT_2);
    }
    if quad.v3() >= min_container_vertex_id {
        infinite_verts.push(VERT_3);
    }

    if infinite_verts.is_empty() {
        // General case: no infinite vertices
        // Test if `from_vertex_id` is inside the circumcircle of the opposite triangle
        is_vertex_in_triangle_circumcircle(&quad_vertices.0[0..=2], quad_vertices.q4())
    } else if infinite_verts.len() == 1 {
        is_vertex_in_half_plane_1(infinite_verts[0], &quad_vertices)
    } else {
        is_vertex_in_half_plane_2(infinite_verts[0], infinite_verts[1], &quad_vertices)
    }
    // 3 infinite vertices is not possible by construction, the container triangle is split into
    // 3 triangles as soon as the first point is inserted.
}

#[derive(PartialEq, Eq, Debug)]
pub enum QuadSwapResult {
    /// Contains the new triangle pairs to check
    Swapped((TriangleId, Neighbor), (TriangleId, Neighbor)),
    NotSwapped,
}

/// ```text
///                q3
///         t3   /    \   t4
///            /   To   \
///          /            \
///         q1 ---------- q2
///          \ 2        3 /
///            \   Tf   /
///              \ 1  /
///                q4
/// ```
///
/// If q4 is in the circumcircle of the triangle q1q2q3, the two triangles form a convex
/// quadrilateral whose diagonal is drawn in the wrong direction. We swap this diagonal to form
/// two new triangles so that the structure of the Delaunay triangulation is locally restored.
///
/// The quad becomes
///
/// ```text
///               q3
///         t3  / 3|2 \   t4
///           /    |    \
///         /      |      \
///        q1 2  Tf|To   3 q2
///         \      |      /
///           \    |    /
///             \ 1|1 /
///               q4
/// ```
pub(crate) fn check_and_swap_quad_diagonal(
    triangles: &mut Triangles,
    vertices: &[Vertex],
    min_container_vertex_id: VertexId,
    from_vertex_id: VertexId,
    from_triangle_id: TriangleId,
    opposite_triangle_id: TriangleId,
) -> QuadSwapResult {
    let opposite_triangle = triangles.get(opposite_triangle_id);

    let (quad, triangle_3, triangle_4) =
    // No need to check if the neighbor exists, handled by the == check since `from_triangle_id`
    // exists
        if opposite_triangle.neighbor12() == Some(from_triangle_id) {
            (
                Quad::new([
                    opposite_triangle.v2(),
                    opposite_triangle.v1(),
                    opposite_triangle.v3(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor23(),
                opposite_triangle.neighbor31(),
            )
        } else if opposite_triangle.neighbor23() == Some(from_triangle_id) {
            (
                Quad::new([
                    opposite_triangle.v3(),
                    opposite_triangle.v2(),
                    opposite_triangle.v1(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor31(),
                opposite_triangle.neighbor12(),
            )
        } else {
            (
                Quad::new([
                    opposite_triangle.v1(),
                    opposite_triangle.v3(),
                    opposite_triangle.v2(),
                    from_vertex_id,
                ]),
                opposite_triangle.neighbor12(),
                opposite_triangle.neighbor23(),
            )
        };

    if should_swap_diagonals(&quad, vertices, min_container_vertex_id) {
        let opposite_neighbor = Some(opposite_triangle_id);
        let from_neighbor = Some(from_triangle_id);

        update_triangle_neighbor(triangle_3, opposite_neighbor, from_neighbor, triangles);
        update_triangle_neighbor(
            triangles.get(from_triangle_id).neighbor31(),
            from_neighbor,
            opposite_neighbor,
            triangles,
        );

        let from_neighbor31 = triangles.get(from_triangle_id).neighbor31();

        triangles.get_mut(from_triangle_id).verts = [quad.v4(), quad.v1(), quad.v3()];

        let opposite = triangles.get_mut(opposite_triangle_id);
        opposite.verts = [quad.v4(), quad.v3(), quad.v2()];
        opposite.neighbors = [from_neighbor, triangle_4, from_neighbor31];

        let from = triangles.get_mut(from_triangle_id);
        from.neighbors[1] = triangle_3;
        from.neighbors[2] = opposite_neighbor;

        QuadSwapResult::Swapped(
            (from_triangle_id, triangle_3),
            (opposite_triangle_id, triangle_4),
        )
    } else {
        QuadSwapResult::NotSwapped
    }
}

/// Removes every triangle with a container vertex and re-orients the surviving triangles
/// counter-clockwise.
fn filter_container_triangles(
    triangles: &Triangles,
    min_container_vertex_id: VertexId,
    points: &[Vertex],
) -> Vec<[VertexId; 3]> {
    #[cfg(feature = "profile_traces")]
    let _span = span!(Level::TRACE, "filter_container_triangles").entered();

    #[cfg(feature = "parallel_filtering")]
    if triangles.count() > FILTER_PARALLEL_TRI_COUNT_THRESHOLD {
        return triangles
            .buffer()
            .par_iter()
            .with_min_len(FILTER_PARALLEL_MIN_BATCH_LEN)
            .filter_map(|triangle| keep_finite_triangle(triangle, min_container_vertex_id, points))
            .collect();
    }

    triangles
        .buffer()
        .iter()
        .filter_map(|triangle| keep_finite_triangle(triangle, min_container_vertex_id, points))
        .collect()
}

#[inline]
fn keep_finite_triangle(
    triangle: &TriangleData,
    min_container_vertex_id: VertexId,
    points: &[Vertex],
) -> Option<[VertexId; 3]> {
    for &vert in triangle.verts.iter() {
        if vert >= min_container_vertex_id {
            return None;
        }
    }
    let [v1, v2, v3] = triangle.verts;
    // The insertion loop produces clockwise triangles; flip them here
    if signed_area(points[v1], points[v2], points[v3]) < 0. {
        Some([v1, v3, v2])
    } else {
        Some([v1, v2, v3])
    }
}

/// Label the bins so that bins with consecutive indexes are spatially adjacent to one another
pub(crate) struct VertexBinSort {
    bins_per_row: usize,
    bins_count: usize,
}

impl VertexBinSort {
    // Each bin will contain roughly vertices.len()^(vertex_density_power) vertices
    pub fn sort(vertices: &[Vertex], vertex_density_power: f64) -> Vec<VertexId> {
        let bins_per_row = (vertices.len() as f64)
            .powf(vertex_density_power / 2.)
            .round() as usize;

        let bin_sort = Self {
            bins_per_row,
            bins_count: bins_per_row * bins_per_row,
        };

        // Indexes of the bin corresponding to each vertex
        let mut vertices_bin_indexes = Vec::with_capacity(vertices.len());
        // Will be used to represent the index of a sorted vertex
        let mut bins_counters = vec![0; bin_sort.bins_count];

        for vertex in vertices {
            let bin_index = bin_sort.bin_index_from_vertex(*vertex);
            vertices_bin_indexes.push(bin_index);
            // Start by counting vertices in each bin
            bins_counters[bin_index] += 1;
        }

        // Add the amount of vertices in previous bins to each bin
        for bin_index in 1..bin_sort.bins_count {
            bins_counters[bin_index] += bins_counters[bin_index - 1];
        }

        let mut sorted = vec![0; vertices.len()];
        for vertex_id in 0..vertices.len() {
            let bin_index = vertices_bin_indexes[vertex_id];
            bins_counters[bin_index] -= 1;
            sorted[bins_counters[bin_index]] = vertex_id;
        }
        sorted
    }

    fn bin_index_from_vertex(&self, vertex: Vertex) -> usize {
        // Compute a bin index from a vertex position which is in [0, 1]
        let bin_x = (0.99 * self.bins_per_row as Float * vertex.x) as usize;
        let bin_y = (0.99 * self.bins_per_row as Float * vertex.y) as usize;
        self.bin_index_from_bin_position(bin_x, bin_y)
    }

    fn bin_index_from_bin_position(&self, x: usize, y: usize) -> usize {
        if y % 2 == 0 {
            (y * self.bins_per_row) + x
        } else {
            (y + 1) * self.bins_per_row - x - 1
        }
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////
