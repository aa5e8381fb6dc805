use amend_geo::{weighted_mean, MultiPolygon, Point, Ring};
use proptest::prelude::*;

fn square(x0: f64, y0: f64, side: f64) -> MultiPolygon {
    MultiPolygon {
        polygons: vec![(
            Ring(vec![
                Point::new(x0, y0),
                Point::new(x0 + side, y0),
                Point::new(x0 + side, y0 + side),
                Point::new(x0, y0 + side),
            ]),
            vec![],
        )],
    }
}

proptest! {
    #[test]
    fn weighted_mean_is_invariant_under_population_scaling(
        values in proptest::collection::vec(0.0f64..1.0, 1..20),
        pops in proptest::collection::vec(1u64..100_000, 1..20),
        scale in 2u64..16,
    ) {
        let n = values.len().min(pops.len());
        let values = &values[..n];
        let pops = &pops[..n];
        let scaled: Vec<u64> = pops.iter().map(|p| p * scale).collect();

        let base = weighted_mean(values, pops).expect("nonzero population");
        let rescaled = weighted_mean(values, &scaled).expect("nonzero population");
        prop_assert!((base - rescaled).abs() < 1e-9);
    }

    #[test]
    fn weighted_mean_stays_within_value_bounds(
        values in proptest::collection::vec(0.0f64..1.0, 1..20),
        pops in proptest::collection::vec(1u64..100_000, 1..20),
    ) {
        let n = values.len().min(pops.len());
        let mean = weighted_mean(&values[..n], &pops[..n]).expect("nonzero population");
        prop_assert!((0.0..=1.0).contains(&mean));
    }

    #[test]
    fn strictly_interior_points_are_contained(
        x in 0.01f64..0.99,
        y in 0.01f64..0.99,
    ) {
        prop_assert!(square(0.0, 0.0, 1.0).contains(&Point::new(x, y)));
    }

    #[test]
    fn points_beyond_the_square_are_not_contained(
        x in 1.01f64..10.0,
        y in 0.0f64..1.0,
    ) {
        prop_assert!(!square(0.0, 0.0, 1.0).contains(&Point::new(x, y)));
    }
}
