pub mod adjacency;
pub mod delaunay;
pub mod error;
pub mod permutation;
pub mod spatial;
pub mod surface;
pub mod triangulation;
pub mod types;
pub mod utils;

pub use glam;
pub use hashbrown;

pub use error::TriangulationError;
pub use spatial::KdTree;
pub use surface::{
    Convergence, GradientEstimate, Interpolation, InterpolationOrder, PointLocation, Smoothed,
    SmoothingStatus,
};
pub use triangulation::{
    remove_duplicates, Refinement, Triangulation, TriangulationConfiguration,
};
pub use types::{Float, Segment, Vertex};

///////////////////////////////////////////////////////////
///                                                     ///
///                        Tests                        ///
///                                                     ///
///////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::{
        Float, InterpolationOrder, PointLocation, Refinement, Triangulation,
        TriangulationConfiguration, TriangulationError, Vertex,
    };

    fn permuted() -> TriangulationConfiguration {
        TriangulationConfiguration {
            permute: true,
            ..Default::default()
        }
    }

    /// Square corners plus two interior points biased towards the center.
    ///
    /// 3-------------2
    /// |         b   |
    /// |     a       |
    /// 0-------------1
    fn biased_square() -> Vec<Vertex> {
        vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
            Vertex::new(0.3, 0.45),
            Vertex::new(0.65, 0.6),
        ]
    }

    fn scattered(count: usize, seed: u64) -> Vec<Vertex> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| Vertex::new(rng.gen_range(0.0..4.0), rng.gen_range(0.0..4.0)))
            .collect()
    }

    #[test]
    fn permutation_round_trip_reproduces_the_input() {
        let points = scattered(24, 3);
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        assert_eq!(points, triangulation.points());
        let xs: Vec<Float> = points.iter().map(|p| p.x).collect();
        let ys: Vec<Float> = points.iter().map(|p| p.y).collect();
        assert_eq!(xs, triangulation.x());
        assert_eq!(ys, triangulation.y());
    }

    #[test]
    fn all_triangles_are_ccw_with_distinct_vertices() {
        for seed in [1, 2, 3] {
            let points = scattered(30, seed);
            let triangulation = Triangulation::new(&points, permuted()).unwrap();

            let simplices = triangulation.simplices();
            let areas = triangulation.areas();
            assert_eq!(simplices.len(), areas.len());
            assert!(!simplices.is_empty());
            for (simplex, area) in simplices.iter().zip(areas) {
                assert!(area > 0.);
                assert!(simplex[0] != simplex[1]);
                assert!(simplex[1] != simplex[2]);
                assert!(simplex[0] != simplex[2]);
            }
        }
    }

    #[test]
    fn segments_are_unique_canonical_pairs() {
        let points = scattered(30, 5);
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let segments = triangulation.segments();
        for segment in &segments {
            assert!(segment.n1 < segment.n2);
        }
        let mut deduped = segments.clone();
        deduped.dedup();
        assert_eq!(segments.len(), deduped.len());
    }

    #[test]
    fn midpoint_refinement_matches_the_segment_count_and_rebuilds() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, Default::default()).unwrap();
        let segment_count = triangulation.segments().len();

        let refined = triangulation.uniformly_refine_triangulation(Refinement::Midpoints);
        assert_eq!(points.len() + segment_count, refined.len());

        let rebuilt = Triangulation::new(&refined, Default::default())
            .expect("the augmented point set should not contain duplicates");
        assert_eq!(refined.len(), rebuilt.npoints());
        for area in rebuilt.areas() {
            assert!(area > 0.);
        }
    }

    #[test]
    fn barycentric_coordinates_are_normalized_and_interior_points_are_convex() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let queries = [Vertex::new(0.45, 0.3), Vertex::new(0.2, 0.7)];
        let located = triangulation.containing_simplex_and_bcc(&queries);
        for entry in located {
            let (_, bcc) = entry.expect("queries are inside the hull");
            let sum: Float = bcc.iter().sum();
            assert!((sum - 1.).abs() < 1e-12);
            for weight in bcc {
                assert!(weight >= 0.);
            }
        }
    }

    #[test]
    fn barycentric_coordinates_reconstruct_the_square_centroid() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let centroid = Vertex::new(0.5, 0.5);
        let located = triangulation.containing_simplex_and_bcc(&[centroid]);
        let (simplex, bcc) = located[0].expect("the centroid is inside the hull");

        let mut reconstructed = Vertex::ZERO;
        for (vertex, weight) in simplex.iter().zip(bcc) {
            reconstructed += weight * points[*vertex];
        }
        assert!((reconstructed - centroid).length() < 1e-12);
    }

    #[test]
    fn convex_hull_of_the_square_is_its_corners() {
        // 3-------------2
        // |             |
        // |   4    5    |
        // |             |
        // 0-------------1
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
            Vertex::new(0.35, 0.4),
            Vertex::new(0.6, 0.55),
        ];
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let mut hull = triangulation.convex_hull();
        hull.sort_unstable();
        assert_eq!(vec![0, 1, 2, 3], hull);
    }

    #[test]
    fn join_with_itself_returns_the_unique_point_count() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let joined = triangulation.join(&triangulation, false);
        assert_eq!(points.len(), joined.len());
    }

    #[test]
    fn gradient_rejects_mismatched_field_sizes() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, Default::default()).unwrap();

        let too_short = vec![1.; points.len() - 1];
        let result = triangulation.gradient(&too_short, 3, 1e-3);
        assert!(matches!(
            result.err(),
            Some(TriangulationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn gradient_of_a_linear_field_is_exact_through_the_permutation() {
        let points = scattered(25, 11);
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let values: Vec<Float> = points.iter().map(|p| 2. * p.x - p.y + 4.).collect();
        let estimate = triangulation.gradient(&values, 10, 1e-3).unwrap();

        for (dfdx, dfdy) in estimate.dfdx.iter().zip(estimate.dfdy.iter()) {
            assert!((dfdx - 2.).abs() < 1e-8);
            assert!((dfdy + 1.).abs() < 1e-8);
        }
    }

    #[test]
    fn nearest_interpolation_classifies_against_the_hull() {
        // 3-------------2
        // |             |
        // |             |
        // 0-------------1
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
        ];
        let triangulation = Triangulation::new(&points, Default::default()).unwrap();
        let values = vec![0., 1., 2., 3.];

        let result = triangulation
            .interpolate(
                &[
                    Vertex::new(0.1, 0.1),
                    Vertex::new(0.5, 0.),
                    Vertex::new(2., 2.),
                ],
                &values,
                InterpolationOrder::Nearest,
            )
            .unwrap();

        assert_eq!(0., result.values[0]);
        assert_eq!(PointLocation::Inside, result.locations[0]);
        // Exactly on the hull boundary still counts as inside
        assert_eq!(PointLocation::Inside, result.locations[1]);
        assert_eq!(2., result.values[2]);
        assert_eq!(PointLocation::Outside, result.locations[2]);
    }

    #[test]
    fn linear_interpolation_reproduces_a_linear_field() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();
        let values: Vec<Float> = points.iter().map(|p| 1. + 2. * p.x + 3. * p.y).collect();

        let result = triangulation
            .interpolate(
                &[Vertex::new(0.25, 0.3), Vertex::new(0.7, 0.2)],
                &values,
                InterpolationOrder::Linear,
            )
            .unwrap();

        assert!((result.values[0] - (1. + 0.5 + 0.9)).abs() < 1e-12);
        assert!((result.values[1] - (1. + 1.4 + 0.6)).abs() < 1e-12);
        assert_eq!(
            vec![PointLocation::Inside, PointLocation::Inside],
            result.locations
        );
    }

    #[test]
    fn linear_extrapolation_is_flagged_and_evaluated_on_the_hull() {
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
        ];
        let triangulation = Triangulation::new(&points, Default::default()).unwrap();
        let values: Vec<Float> = points.iter().map(|p| 1. + 2. * p.x + 3. * p.y).collect();

        // Projects onto the bottom edge at (0.5, 0)
        let result = triangulation
            .interpolate_linear(&[Vertex::new(0.5, -1.)], &values)
            .unwrap();
        assert_eq!(PointLocation::Outside, result.locations[0]);
        assert!((result.values[0] - 2.).abs() < 1e-12);
    }

    #[test]
    fn cubic_interpolation_with_supplied_gradients_has_quadratic_precision() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let values: Vec<Float> = points.iter().map(|p| p.x * p.x).collect();
        let dfdx: Vec<Float> = points.iter().map(|p| 2. * p.x).collect();
        let dfdy = vec![0.; points.len()];

        let queries = [Vertex::new(0.5, 0.25), Vertex::new(0.4, 0.7)];
        let result = triangulation
            .interpolate_cubic(&queries, &values, Some((&dfdx, &dfdy)))
            .unwrap();

        let (dzx, dzy) = result.derivatives.expect("cubic returns derivatives");
        for (i, query) in queries.iter().enumerate() {
            assert!((result.values[i] - query.x * query.x).abs() < 1e-9);
            assert!((dzx[i] - 2. * query.x).abs() < 1e-9);
            assert!(dzy[i].abs() < 1e-9);
        }
    }

    #[test]
    fn cubic_interpolation_estimates_gradients_when_absent() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();
        let values: Vec<Float> = points.iter().map(|p| 2. * p.x - p.y).collect();

        let query = Vertex::new(0.45, 0.35);
        let result = triangulation
            .interpolate(&[query], &values, InterpolationOrder::Cubic)
            .unwrap();

        assert!((result.values[0] - (2. * query.x - query.y)).abs() < 1e-8);
    }

    #[test]
    fn refinement_levels_grow_the_mesh_at_construction() {
        let points = vec![
            Vertex::new(0., 0.),
            Vertex::new(1., 0.),
            Vertex::new(1., 1.),
            Vertex::new(0., 1.),
        ];
        let triangulation = Triangulation::new(
            &points,
            TriangulationConfiguration {
                refinement_levels: 1,
                ..Default::default()
            },
        )
        .unwrap();

        // 4 corners + 5 segment midpoints
        assert_eq!(9, triangulation.npoints());
        assert_eq!(points, triangulation.points()[..4]);
    }

    #[test]
    fn nearest_vertex_translates_back_to_caller_indices() {
        let points = biased_square();
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let found = triangulation.nearest_vertex(&[Vertex::new(0.95, 0.05), Vertex::new(0.31, 0.46)]);
        assert_eq!(1, found[0].0);
        assert!((found[0].1 - 0.005).abs() < 1e-12);
        assert_eq!(4, found[1].0);
    }

    #[test]
    fn smoothing_returns_values_and_derivatives_in_caller_order() {
        let points = scattered(16, 21);
        let triangulation = Triangulation::new(&points, permuted()).unwrap();

        let values: Vec<Float> = points.iter().map(|p| p.x + p.y).collect();
        let weights = vec![1.; points.len()];
        let smoothed = triangulation
            .smoothing(&values, &weights, 1., 0.1, 1e-6)
            .unwrap();

        assert_eq!(points.len(), smoothed.values.len());
        for (smoothed_value, value) in smoothed.values.iter().zip(values.iter()) {
            assert!((smoothed_value - value).abs() < 1e-5);
        }
    }
}
