//! Surface fitting over a triangulation: gradient estimation, curvature smoothing and
//! scattered-data interpolation.
//!
//! All routines in this module work in engine index order; the public API translates to and
//! from the caller's point order (see [`crate::triangulation`]).

use hashbrown::HashSet;

use crate::adjacency::Adjacency;
use crate::types::{Float, Vertex, VertexId};
use crate::utils::{barycentric, closest_point_on_segment};

/// Interpolation order for scattered-data field interpolation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterpolationOrder {
    /// Order 0: value of the nearest node
    Nearest,
    /// Order 1: piecewise linear, `C0` continuous
    Linear,
    /// Order 3: piecewise cubic from nodal values and gradients
    Cubic,
}

/// Classification of a query point against the triangulation's convex hull.
///
/// Points exactly on the hull boundary count as [`PointLocation::Inside`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Outside,
}

/// Outcome of an iterative estimation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Convergence {
    Converged { iterations: usize },
    /// The iteration limit was reached before the tolerance. The accompanying values are still
    /// usable as a partial result.
    ToleranceNotMet { residual: Float },
}

/// Outcome of a smoothing run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SmoothingStatus {
    /// The deviation constraint is active and satisfied within its relative tolerance
    ConstraintActive,
    /// The curvature minimizer deviates less than the requested bound; the constraint had no
    /// effect on the result
    ConstraintInactive,
    /// The penalty search ran out of iterations before entering the constraint band
    ToleranceNotMet { residual: Float },
}

/// Nodal gradient estimate of a field, in the caller's point order.
#[derive(Debug, Clone)]
pub struct GradientEstimate {
    pub dfdx: Vec<Float>,
    pub dfdy: Vec<Float>,
    pub convergence: Convergence,
}

/// Smoothed field with its first derivatives, in the caller's point order.
#[derive(Debug, Clone)]
pub struct Smoothed {
    pub values: Vec<Float>,
    pub dfdx: Vec<Float>,
    pub dfdy: Vec<Float>,
    pub status: SmoothingStatus,
}

/// Interpolated field values at query points.
#[derive(Debug, Clone)]
pub struct Interpolation {
    pub values: Vec<Float>,
    /// Inside/outside-hull classification per query point; outside values are extrapolated
    pub locations: Vec<PointLocation>,
    /// First derivatives at the query points, returned by cubic interpolation
    pub derivatives: Option<(Vec<Float>, Vec<Float>)>,
}

/// Weighted least-squares fit of a plane through the 1-ring of `node`, weights 1/d².
///
/// Exact for linear fields whenever the ring spans two independent directions.
pub(crate) fn linear_fit_gradient(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    node: VertexId,
) -> Vertex {
    let origin = points[node];
    let (mut a00, mut a01, mut a11) = (0., 0., 0.);
    let (mut b0, mut b1) = (0., 0.);

    for neighbor in adjacency.neighbors(node) {
        let u = points[neighbor] - origin;
        let d2 = u.length_squared();
        if d2 == 0. {
            continue;
        }
        let w = 1. / d2;
        let dz = values[neighbor] - values[node];
        a00 += w * u.x * u.x;
        a01 += w * u.x * u.y;
        a11 += w * u.y * u.y;
        b0 += w * dz * u.x;
        b1 += w * dz * u.y;
    }

    solve_2x2(a00, a01, a11, b0, b1).unwrap_or(Vertex::ZERO)
}

/// Estimates nodal gradients by minimizing the linearized curvature of the Hermite interpolant
/// along the triangulation arcs.
///
/// Gradients are initialized with a local least-squares fit, then refined with Gauss-Seidel
/// sweeps: each sweep re-solves every node's 2x2 system with the neighbor gradients held at
/// their freshest values. Convergence is reached when the largest gradient change of a sweep
/// drops below `tol`.
pub(crate) fn estimate_gradients(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    nit: usize,
    tol: Float,
) -> (Vec<Vertex>, Convergence) {
    let node_count = adjacency.node_count();
    let mut gradients: Vec<Vertex> = (0..node_count)
        .map(|node| linear_fit_gradient(adjacency, points, values, node))
        .collect();

    let mut residual = 0.;
    for iteration in 0..nit {
        let mut sweep_residual = 0.;
        for node in 0..node_count {
            let (mut a00, mut a01, mut a11) = (0., 0., 0.);
            let (mut b0, mut b1) = (0., 0.);

            for neighbor in adjacency.neighbors(node) {
                let arc = points[neighbor] - points[node];
                let len = arc.length();
                if len == 0. {
                    continue;
                }
                let u = arc / len;
                let dz = values[neighbor] - values[node];
                let coupled = gradients[neighbor].dot(u);

                // d/dg of the arc curvature 12dz²/L³ - 12dz(d0+d1)/L² + 4(d0²+d0d1+d1²)/L
                let scale = 8. / len;
                a00 += scale * u.x * u.x;
                a01 += scale * u.x * u.y;
                a11 += scale * u.y * u.y;
                let rhs = 12. * dz / (len * len) - 4. * coupled / len;
                b0 += rhs * u.x;
                b1 += rhs * u.y;
            }

            if let Some(updated) = solve_2x2(a00, a01, a11, b0, b1) {
                let change = (updated - gradients[node]).length();
                if change > sweep_residual {
                    sweep_residual = change;
                }
                gradients[node] = updated;
            }
        }
        residual = sweep_residual;
        if residual <= tol {
            return (
                gradients,
                Convergence::Converged {
                    iterations: iteration + 1,
                },
            );
        }
    }

    (gradients, Convergence::ToleranceNotMet { residual })
}

/// Gradient at a single node from a weighted least-squares quadratic fit of its neighborhood.
///
/// Uses the 1-ring, extended with the 2-ring when the quadratic fit would be underdetermined;
/// falls back to the linear fit if the neighborhood is rank deficient.
pub(crate) fn gradient_at_node(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    node: VertexId,
) -> Vertex {
    let mut neighborhood = adjacency.neighbors(node);
    if neighborhood.len() < 5 {
        let mut seen: HashSet<VertexId> = neighborhood.iter().copied().collect();
        seen.insert(node);
        let ring = neighborhood.clone();
        for first in ring {
            for second in adjacency.neighbors(first) {
                if seen.insert(second) {
                    neighborhood.push(second);
                }
            }
        }
    }

    // z(u) = z0 + g·u + u'Hu/2, unknowns (gx, gy, hxx, hxy, hyy), weights 1/d²
    let origin = points[node];
    let mut a = [[0.; 5]; 5];
    let mut b = [0.; 5];
    for &member in &neighborhood {
        let u = points[member] - origin;
        let d2 = u.length_squared();
        if d2 == 0. {
            continue;
        }
        let w = 1. / d2;
        let row = [u.x, u.y, 0.5 * u.x * u.x, u.x * u.y, 0.5 * u.y * u.y];
        let dz = values[member] - values[node];
        for i in 0..5 {
            for j in 0..5 {
                a[i][j] += w * row[i] * row[j];
            }
            b[i] += w * row[i] * dz;
        }
    }

    match solve_dense(&mut a, &mut b) {
        Some(solution) => Vertex::new(solution[0], solution[1]),
        None => linear_fit_gradient(adjacency, points, values, node),
    }
}

/// Smooths `values` by minimizing arc curvature subject to the weighted-deviation bound
/// `sum(w_i (f_i - z_i)²) <= sm`, with `smtol` the relative width of the acceptance band around
/// `sm` and `gstol` the convergence tolerance of the inner relaxation.
///
/// The constrained problem is solved through its penalized form: the deviation penalty `p` is
/// bracketed and bisected in log space until the deviation lands inside the band. A bound loose
/// enough to never activate is reported as [`SmoothingStatus::ConstraintInactive`].
pub(crate) fn smooth(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    weights: &[Float],
    sm: Float,
    smtol: Float,
    gstol: Float,
) -> (Vec<Float>, Vec<Vertex>, SmoothingStatus) {
    let upper = sm * (1. + smtol);
    let lower = sm * (1. - smtol);

    let deviation = |f: &[Float]| -> Float {
        f.iter()
            .zip(values)
            .zip(weights)
            .map(|((fi, zi), wi)| wi * (fi - zi) * (fi - zi))
            .sum()
    };

    // The deviation decreases monotonically as the penalty grows; bracket, then bisect in log
    // space.
    let mut p_hi = 1.0;
    let (mut f, mut gradients) = solve_penalized(adjacency, points, values, weights, p_hi, gstol);
    let mut q2 = deviation(&f);
    for _ in 0..60 {
        if q2 <= upper {
            break;
        }
        p_hi *= 4.;
        let solved = solve_penalized(adjacency, points, values, weights, p_hi, gstol);
        f = solved.0;
        gradients = solved.1;
        q2 = deviation(&f);
    }
    if q2 > upper {
        return (f, gradients, SmoothingStatus::ToleranceNotMet { residual: q2 - sm });
    }
    if q2 >= lower {
        return (f, gradients, SmoothingStatus::ConstraintActive);
    }

    // Constraint slack at p_hi; relax the penalty to find the other side of the band
    let mut p_lo = p_hi;
    let mut under = (f, gradients);
    let mut under_q2 = q2;
    loop {
        p_lo /= 4.;
        if p_lo < 1e-12 {
            return (under.0, under.1, SmoothingStatus::ConstraintInactive);
        }
        let solved = solve_penalized(adjacency, points, values, weights, p_lo, gstol);
        let q2_lo = deviation(&solved.0);
        if q2_lo > upper {
            break;
        }
        if q2_lo >= lower {
            return (solved.0, solved.1, SmoothingStatus::ConstraintActive);
        }
        under = (solved.0, solved.1);
        under_q2 = q2_lo;
    }

    for _ in 0..50 {
        let p_mid = (p_lo * p_hi).sqrt();
        let solved = solve_penalized(adjacency, points, values, weights, p_mid, gstol);
        let q2_mid = deviation(&solved.0);
        if q2_mid > upper {
            p_lo = p_mid;
        } else if q2_mid < lower {
            p_hi = p_mid;
            under = (solved.0, solved.1);
            under_q2 = q2_mid;
        } else {
            return (solved.0, solved.1, SmoothingStatus::ConstraintActive);
        }
    }

    (
        under.0,
        under.1,
        SmoothingStatus::ToleranceNotMet {
            residual: (under_q2 - sm).abs(),
        },
    )
}

/// Minimizes `arc curvature + p * sum(w_i (f_i - z_i)²)` by alternating gradient refreshes with
/// Gauss-Seidel relaxation of the nodal values.
fn solve_penalized(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    weights: &[Float],
    p: Float,
    gstol: Float,
) -> (Vec<Float>, Vec<Vertex>) {
    let node_count = adjacency.node_count();
    let mut f = values.to_vec();
    let (mut gradients, _) = estimate_gradients(adjacency, points, &f, 2, 0.);

    for _cycle in 0..4 {
        for _sweep in 0..100 {
            let mut change: Float = 0.;
            for node in 0..node_count {
                let mut num = 2. * p * weights[node] * values[node];
                let mut den = 2. * p * weights[node];
                for neighbor in adjacency.neighbors(node) {
                    let arc = points[neighbor] - points[node];
                    let len = arc.length();
                    if len == 0. {
                        continue;
                    }
                    let u = arc / len;
                    let d0 = gradients[node].dot(u);
                    let d1 = gradients[neighbor].dot(u);
                    num += 24. * f[neighbor] / (len * len * len) - 12. * (d0 + d1) / (len * len);
                    den += 24. / (len * len * len);
                }
                let updated = num / den;
                change = change.max((updated - f[node]).abs());
                f[node] = updated;
            }
            if change <= gstol {
                break;
            }
        }

        // Refresh the gradients for the relaxed surface before the next cycle
        let (refreshed, _) = estimate_gradients(adjacency, points, &f, 2, 0.);
        gradients = refreshed;
    }

    (f, gradients)
}

/// Linear interpolation at `p`: barycentric combination inside the hull, linear evaluation at
/// the nearest hull point outside of it.
pub(crate) fn interpolate_linear_at(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    p: Vertex,
    seed: VertexId,
) -> (Float, PointLocation) {
    match adjacency.locate(points, p, seed) {
        Some([a, b, c]) => {
            let bcc = barycentric(points[a], points[b], points[c], p);
            (
                bcc[0] * values[a] + bcc[1] * values[b] + bcc[2] * values[c],
                PointLocation::Inside,
            )
        }
        None => {
            let (a, b, t, _) = nearest_hull_point(adjacency, points, p);
            ((1. - t) * values[a] + t * values[b], PointLocation::Outside)
        }
    }
}

/// Cubic interpolation at `p` from nodal values and gradients. Returns the interpolated value
/// and its first derivatives.
///
/// Exterior points evaluate the patch of the triangle adjacent to the nearest hull edge, at the
/// projection of `p` onto the hull.
pub(crate) fn interpolate_cubic_at(
    adjacency: &Adjacency,
    points: &[Vertex],
    values: &[Float],
    gradients: &[Vertex],
    p: Vertex,
    seed: VertexId,
) -> (Float, Vertex, PointLocation) {
    match adjacency.locate(points, p, seed) {
        Some([a, b, c]) => {
            let patch = CubicPatch::new(
                [points[a], points[b], points[c]],
                [values[a], values[b], values[c]],
                [gradients[a], gradients[b], gradients[c]],
            );
            let bcc = barycentric(points[a], points[b], points[c], p);
            let (value, gradient) = patch.evaluate(bcc);
            (value, gradient, PointLocation::Inside)
        }
        None => {
            let (a, b, _, projected) = nearest_hull_point(adjacency, points, p);
            match adjacency.apex_left(a, b) {
                Some(c) => {
                    let patch = CubicPatch::new(
                        [points[a], points[b], points[c]],
                        [values[a], values[b], values[c]],
                        [gradients[a], gradients[b], gradients[c]],
                    );
                    let bcc = barycentric(points[a], points[b], points[c], projected);
                    let (value, gradient) = patch.evaluate(bcc);
                    (value, gradient, PointLocation::Outside)
                }
                None => (values[a], Vertex::ZERO, PointLocation::Outside),
            }
        }
    }
}

/// Closest point to `p` on the hull boundary, returned as the hull edge `(a, b)`, the parameter
/// of the projection along it and the projected point itself.
fn nearest_hull_point(
    adjacency: &Adjacency,
    points: &[Vertex],
    p: Vertex,
) -> (VertexId, VertexId, Float, Vertex) {
    let hull = adjacency.boundary_nodes();
    let mut best = (hull[0], hull[0], 0., points[hull[0]]);
    let mut best_dist = Float::MAX;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let (candidate, t) = closest_point_on_segment(points[a], points[b], p);
        let dist = candidate.distance_squared(p);
        if dist < best_dist {
            best_dist = dist;
            best = (a, b, t, candidate);
        }
    }
    best
}

/// Cubic Bézier triangle built from corner values and gradients, with the center control point
/// chosen for quadratic precision.
struct CubicPatch {
    corners: [Vertex; 3],
    b300: Float,
    b030: Float,
    b003: Float,
    b210: Float,
    b201: Float,
    b120: Float,
    b021: Float,
    b102: Float,
    b012: Float,
    b111: Float,
}

impl CubicPatch {
    fn new(corners: [Vertex; 3], z: [Float; 3], g: [Vertex; 3]) -> Self {
        let [p0, p1, p2] = corners;
        let b210 = z[0] + (p1 - p0).dot(g[0]) / 3.;
        let b201 = z[0] + (p2 - p0).dot(g[0]) / 3.;
        let b120 = z[1] + (p0 - p1).dot(g[1]) / 3.;
        let b021 = z[1] + (p2 - p1).dot(g[1]) / 3.;
        let b102 = z[2] + (p0 - p2).dot(g[2]) / 3.;
        let b012 = z[2] + (p1 - p2).dot(g[2]) / 3.;
        let edge_mean = (b210 + b201 + b120 + b021 + b102 + b012) / 6.;
        let corner_mean = (z[0] + z[1] + z[2]) / 3.;
        Self {
            corners,
            b300: z[0],
            b030: z[1],
            b003: z[2],
            b210,
            b201,
            b120,
            b021,
            b102,
            b012,
            b111: edge_mean + (edge_mean - corner_mean) / 2.,
        }
    }

    fn evaluate(&self, bcc: [Float; 3]) -> (Float, Vertex) {
        let [u, v, w] = bcc;
        let value = u * u * u * self.b300
            + v * v * v * self.b030
            + w * w * w * self.b003
            + 3. * u * u * v * self.b210
            + 3. * u * u * w * self.b201
            + 3. * v * v * u * self.b120
            + 3. * v * v * w * self.b021
            + 3. * w * w * u * self.b102
            + 3. * w * w * v * self.b012
            + 6. * u * v * w * self.b111;

        let du = 3.
            * (u * u * self.b300
                + v * v * self.b120
                + w * w * self.b102
                + 2. * u * v * self.b210
                + 2. * u * w * self.b201
                + 2. * v * w * self.b111);
        let dv = 3.
            * (v * v * self.b030
                + u * u * self.b210
                + w * w * self.b012
                + 2. * u * v * self.b120
                + 2. * v * w * self.b021
                + 2. * u * w * self.b111);
        let dw = 3.
            * (w * w * self.b003
                + u * u * self.b201
                + v * v * self.b021
                + 2. * u * w * self.b102
                + 2. * v * w * self.b012
                + 2. * u * v * self.b111);

        let [p0, p1, p2] = self.corners;
        let area2 = (p1 - p0).perp_dot(p2 - p0);
        let gradient = if area2 == 0. {
            Vertex::ZERO
        } else {
            ((p2 - p1).perp() * du + (p0 - p2).perp() * dv + (p1 - p0).perp() * dw) / area2
        };
        (value, gradient)
    }
}

fn solve_2x2(a00: Float, a01: Float, a11: Float, b0: Float, b1: Float) -> Option<Vertex> {
    let det = a00 * a11 - a01 * a01;
    if det == 0. || det.abs() <= 1e-12 * (a00 * a11).abs() {
        return None;
    }
    Some(Vertex::new(
        (b0 * a11 - b1 * a01) / det,
        (a00 * b1 - a01 * b0) / det,
    ))
}

/// Gaussian elimination with partial pivoting on a 5x5 system.
fn solve_dense(a: &mut [[Float; 5]; 5], b: &mut [Float; 5]) -> Option<[Float; 5]> {
    for col in 0..5 {
        let mut pivot = col;
        for row in col + 1..5 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..5 {
            let factor = a[row][col] / a[col][col];
            for k in col..5 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = [0.; 5];
    for row in (0..5).rev() {
        let mut sum = b[row];
        for col in row + 1..5 {
            sum -= a[row][col] * solution[col];
        }
        solution[row] = sum / a[row][row];
    }
    Some(solution)
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{
        estimate_gradients, gradient_at_node, interpolate_cubic_at, interpolate_linear_at,
        smooth, Convergence, PointLocation, SmoothingStatus,
    };
    use crate::adjacency::Adjacency;
    use crate::delaunay::triangulate;
    use crate::types::{Float, Vertex};

    fn fan() -> (Vec<Vertex>, Adjacency) {
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

    /// 3x3 grid over the unit square, ordered so that the first three points are not collinear.
    fn grid() -> (Vec<Vertex>, Adjacency) {
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(0.5, 0.5),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
            Vertex::new(0.5, 0.),
            Vertex::new(1., 0.5),
            Vertex::new(0.5, 1.),
            Vertex::new(0., 0.5),
        ];
        let adjacency = triangulate(&points).unwrap();
        (points, adjacency)
    }

    fn field(points: &[Vertex], f: impl Fn(Vertex) -> Float) -> Vec<Float> {
        points.iter().map(|&p| f(p)).collect()
    }

    #[test]
    fn gradients_of_linear_field_are_exact() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| 2. * p.x + 3. * p.y - 1.);

        let (gradients, convergence) = estimate_gradients(&adjacency, &points, &values, 10, 1e-3);

        assert!(matches!(convergence, Convergence::Converged { .. }));
        for gradient in gradients {
            assert!((gradient.x - 2.).abs() < 1e-9);
            assert!((gradient.y - 3.).abs() < 1e-9);
        }
    }

    #[test]
    fn local_gradient_of_quadratic_field() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| p.x * p.x);

        // Gradient of x² at the grid center (0.5, 0.5)
        let gradient = gradient_at_node(&adjacency, &points, &values, 2);
        assert!((gradient.x - 1.).abs() < 1e-8);
        assert!(gradient.y.abs() < 1e-8);
    }

    #[test]
    fn local_gradient_with_small_ring_falls_back_cleanly() {
        let (points, adjacency) = fan();
        let values = field(&points, |p| {
            (p.x - 0.5).powi(2) + (p.y - 0.5).powi(2)
        });

        let gradient = gradient_at_node(&adjacency, &points, &values, 4);
        assert!(gradient.x.abs() < 1e-9);
        assert!(gradient.y.abs() < 1e-9);
    }

    #[test]
    fn linear_interpolation_reproduces_linear_fields() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| 4. * p.x - 2. * p.y + 0.5);

        let queries = [
            Vertex::new(0.3, 0.3),
            Vertex::new(0.8, 0.1),
            Vertex::new(0.5, 0.5),
        ];
        for q in queries {
            let (value, location) = interpolate_linear_at(&adjacency, &points, &values, q, 0);
            assert_eq!(PointLocation::Inside, location);
            assert!((value - (4. * q.x - 2. * q.y + 0.5)).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_extrapolation_evaluates_at_the_hull() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| p.y);

        // Projects onto the hull edge x = 1 at height 0.5
        let (value, location) =
            interpolate_linear_at(&adjacency, &points, &values, Vertex::new(2., 0.5), 0);
        assert_eq!(PointLocation::Outside, location);
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cubic_interpolation_has_quadratic_precision() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| p.x * p.x);
        let gradients: Vec<Vertex> = points.iter().map(|p| Vertex::new(2. * p.x, 0.)).collect();

        let queries = [Vertex::new(0.3, 0.2), Vertex::new(0.7, 0.8)];
        for q in queries {
            let (value, gradient, location) =
                interpolate_cubic_at(&adjacency, &points, &values, &gradients, q, 0);
            assert_eq!(PointLocation::Inside, location);
            assert!((value - q.x * q.x).abs() < 1e-9);
            assert!((gradient.x - 2. * q.x).abs() < 1e-9);
            assert!(gradient.y.abs() < 1e-9);
        }
    }

    #[test]
    fn smoothing_keeps_linear_data_with_inactive_constraint() {
        let (points, adjacency) = grid();
        let values = field(&points, |p| p.x + p.y);
        let weights = vec![1.; points.len()];

        let (smoothed, _, status) =
            smooth(&adjacency, &points, &values, &weights, 1., 0.1, 1e-6);

        assert_eq!(SmoothingStatus::ConstraintInactive, status);
        for (smoothed_value, value) in smoothed.iter().zip(values.iter()) {
            assert!((smoothed_value - value).abs() < 1e-6);
        }
    }
}
