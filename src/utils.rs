use crate::types::{Float, Vertex};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Orientation {
    Colinear,
    Clockwise,
    CounterClockwise,
}

/// Returns the orientation of an ordered triplet (p, q, r).
pub fn triplet_orientation(p: Vertex, q: Vertex, r: Vertex) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);

    if val == 0. {
        Orientation::Colinear
    } else if val > 0. {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// Cross product of the vectors `o`->`a` and `o`->`b`.
///
/// Positive when `b` is on the left side of the oriented edge `o`->`a`.
#[inline]
pub fn cross2(o: Vertex, a: Vertex, b: Vertex) -> Float {
    (a - o).perp_dot(b - o)
}

/// Signed area of the triangle (a, b, c), positive for a counter-clockwise triple.
#[inline]
pub fn signed_area(a: Vertex, b: Vertex, c: Vertex) -> Float {
    0.5 * (b - a).perp_dot(c - b)
}

/// Returns `true` if and only if the point `p` is on the right side of the oriented edge `e`
///
/// Uses the cross product of vectors e0.e1 and e1.p
#[inline]
pub fn is_point_on_right_side_of_edge(e: (Vertex, Vertex), p: Vertex) -> bool {
    ((p.x - e.0.x) * (e.1.y - e.0.y) - (p.y - e.0.y) * (e.1.x - e.0.x)) >= 0.
}

#[inline]
pub fn line_slope(a: Vertex, b: Vertex) -> Float {
    (b.y - a.y) / (b.x - a.x)
}

/// Barycentric coordinates of `p` with respect to the triangle (a, b, c), computed from the two
/// edge vectors and normalized so that the three weights sum to 1.
///
/// The coordinates of a zero-area triangle are undefined (division by zero); callers must not
/// pass degenerate triangles.
pub fn barycentric(a: Vertex, b: Vertex, c: Vertex, p: Vertex) -> [Float; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    // Absorb any floating-point drift so that u + v + w == 1 exactly
    let sum = u + v + w;
    [u / sum, v / sum, w / sum]
}

/// Closest point to `p` on the segment (a, b), returned with its parameter t in [0, 1]
/// (`result == a + t * (b - a)`).
pub fn closest_point_on_segment(a: Vertex, b: Vertex, p: Vertex) -> (Vertex, Float) {
    let ab = b - a;
    let len_squared = ab.length_squared();
    if len_squared == 0. {
        return (a, 0.);
    }
    let t = ((p - a).dot(ab) / len_squared).clamp(0., 1.);
    (a + t * ab, t)
}

/// Checks if vertex `p` is inside the circumcircle of the triangle formed by the first three vertices in `triangle`
/// - `triangle` contains the vertices of the triangle.
///     - length of `triangle` **MUST** be >= 3.
///     - `triangle` vertices must be in a counter-clockwise order
/// - `p` vertex to check
///
/// ```text
/// v3 --------- v2
/// |          / |
/// |        /   |
/// |      /     |
/// |    /       |
/// |  /         |
/// v1 --------- p
/// ```
///
/// where v1, v2 and v3 are the vertices of the given triangle and p the vertex to check
///
/// See: A. K. Cline and R. Renka,
/// A storage efficient method for construction of a Thiessen triangulation.
/// Rocky Mounfain J. Math. 14, 119-139 (1984)
///
#[inline(always)]
pub(crate) fn is_vertex_in_triangle_circumcircle(triangle: &[Vertex], p: Vertex) -> bool {
    let x13 = triangle[0].x - triangle[2].x;
    let x23 = triangle[1].x - triangle[2].x;
    let y13 = triangle[0].y - triangle[2].y;
    let y23 = triangle[1].y - triangle[2].y;
    let x14 = triangle[0].x - p.x;
    let x24 = triangle[1].x - p.x;
    let y14 = triangle[0].y - p.y;
    let y24 = triangle[1].y - p.y;

    let cos_a = x13 * x23 + y13 * y23;
    let cos_b = x24 * x14 + y24 * y14;

    if cos_a >= 0. && cos_b >= 0. {
        false
    } else if cos_a < 0. && cos_b < 0. {
        true
    } else {
        let sin_a = x13 * y23 - x23 * y13;
        let sin_b = x24 * y14 - x14 * y24;
        let sin_ab = sin_a * cos_b + sin_b * cos_a;
        sin_ab < 0.
    }
}

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::{
        types::{Float, Vertex},
        utils::{
            barycentric, closest_point_on_segment, is_point_on_right_side_of_edge,
            is_vertex_in_triangle_circumcircle, signed_area,
        },
    };

    #[test]
    fn vertex_in_triangle_circumcircle() {
        let unit_circle = [
            Vertex::new(-1., 0.),
            Vertex::new(1., 0.),
            Vertex::new(0., 1.),
        ];

        let step = 100;
        for i in -step..step {
            for j in -step..step {
                let p = Vertex::new(i as Float / step as Float, j as Float / step as Float);
                let p_length = p.length();
                let p_in_circle = is_vertex_in_triangle_circumcircle(&unit_circle, p);
                if p_length < 1. {
                    assert_eq!(true, p_in_circle, "p_length < 1, p should be in the circle");
                } else if p_length > 1. {
                    assert_eq!(
                        false, p_in_circle,
                        "p_length > 1, p should be out of the circle"
                    );
                }
            }
        }
    }

    #[test]
    fn point_edge_orientation_left() {
        let edge = (Vertex::new(0., 0.), Vertex::new(3., 0.));
        let p = Vertex::new(0., 3.);

        let orientation = is_point_on_right_side_of_edge(edge, p);

        assert_eq!(false, orientation);
    }

    #[test]
    fn point_edge_orientation_right() {
        let edge = (Vertex::new(0., 0.), Vertex::new(3., 0.));
        let p = Vertex::new(0., -3.);

        let orientation = is_point_on_right_side_of_edge(edge, p);

        assert_eq!(true, orientation);
    }

    #[test]
    fn area_sign_follows_orientation() {
        let a = Vertex::new(0., 0.);
        let b = Vertex::new(1., 0.);
        let c = Vertex::new(0., 1.);

        assert_eq!(0.5, signed_area(a, b, c));
        assert_eq!(-0.5, signed_area(a, c, b));
    }

    #[test]
    fn barycentric_at_vertices_and_centroid() {
        let a = Vertex::new(0., 0.);
        let b = Vertex::new(2., 0.);
        let c = Vertex::new(0., 2.);

        assert_eq!([1., 0., 0.], barycentric(a, b, c, a));

        let bcc = barycentric(a, b, c, Vertex::new(2. / 3., 2. / 3.));
        let sum: Float = bcc.iter().sum();
        assert!((sum - 1.).abs() < 1e-15);
        for w in bcc {
            assert!((w - 1. / 3.).abs() < 1e-12);
        }
    }

    #[test]
    fn closest_point_clamps_to_segment_ends() {
        let a = Vertex::new(0., 0.);
        let b = Vertex::new(2., 0.);

        let (mid, t) = closest_point_on_segment(a, b, Vertex::new(1., 5.));
        assert_eq!(Vertex::new(1., 0.), mid);
        assert_eq!(0.5, t);

        let (end, t) = closest_point_on_segment(a, b, Vertex::new(7., 1.));
        assert_eq!(b, end);
        assert_eq!(1., t);
    }
}
