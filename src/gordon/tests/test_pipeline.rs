//! End-to-end Gordon construction on networks cut from known surfaces.

use super::{cubic_sheet, iso_deviation, iso_network, paraboloid};
use crate::geom::{
    ConstructionError, DeBoorEvaluator, GeomError, GeometryEvaluator, NurbsSurface, Point3, Quantity, UvDirection,
    ValidationError, insert_knot,
};
use crate::gordon::{GordonOptions, build_gordon_surface, build_gordon_surface_with};

#[test]
fn three_by_three_network_reproduces_the_paraboloid() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, v_curves) = iso_network(2, paraboloid, &levels, &levels);
    let result = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default()).unwrap();
    let surface = &result.surface;
    let eval = DeBoorEvaluator::new();

    assert_eq!((surface.degree_u, surface.degree_v), (2, 2));
    assert_eq!(surface.knots_u.len(), surface.degree_u + surface.u_count + 1);
    assert_eq!(surface.knots_v.len(), surface.degree_v + surface.v_count + 1);

    for &u in &levels {
        for &v in &levels {
            let p = eval.surface_point(surface, u, v).unwrap();
            assert!(p.distance_to(paraboloid(u, v)) < 1e-10, "grid point ({u}, {v})");
        }
    }
    for (curve, &v) in result.u_curves.iter().zip(&result.diagnostics.v_placements) {
        assert!(iso_deviation(surface, UvDirection::V, v, curve, 40) < 1e-10);
    }
    for (curve, &u) in result.v_curves.iter().zip(&result.diagnostics.u_placements) {
        assert!(iso_deviation(surface, UvDirection::U, u, curve, 40) < 1e-10);
    }
    // Biquadratic data, so the Gordon surface is the paraboloid itself.
    for &(u, v) in &[(0.1, 0.9), (0.37, 0.42), (0.8, 0.25)] {
        let p = eval.surface_point(surface, u, v).unwrap();
        assert!(p.distance_to(paraboloid(u, v)) < 1e-10);
    }

    let diag = &result.diagnostics;
    assert!(diag.is_clean(), "{diag}");
    for (got, want) in diag.u_placements.iter().zip(&levels) {
        assert!((got - want).abs() < 1e-12);
    }
    assert!(diag.max_intersection_gap < 1e-12);
}

/// Cubic in u with a knot at 0.4, quadratic in v with a double knot at 0.3.
fn multi_span_sheet() -> NurbsSurface {
    let grid = (0..5)
        .map(|i| {
            (0..6)
                .map(|j| {
                    let (x, y) = (f64::from(i), f64::from(j));
                    Point3::new(x, y, (x * 1.3 + y * 0.7).sin() + 0.2 * x * y)
                })
                .collect()
        })
        .collect();
    NurbsSurface::from_grid(
        3,
        2,
        grid,
        vec![0.0, 0.0, 0.0, 0.0, 0.4, 1.0, 1.0, 1.0, 1.0],
        vec![0.0, 0.0, 0.0, 0.3, 0.3, 0.6, 1.0, 1.0, 1.0],
        None,
    )
    .unwrap()
}

#[test]
fn multi_span_network_with_mixed_degrees_interpolates_every_curve() {
    let sheet = multi_span_sheet();
    let u_levels = [0.0, 0.3, 0.7, 1.0];
    let v_levels = [0.0, 0.2, 0.55, 1.0];
    let mut u_curves: Vec<_> = v_levels
        .iter()
        .map(|&v| sheet.iso_curve(UvDirection::V, v).unwrap())
        .collect();
    let v_curves: Vec<_> = u_levels
        .iter()
        .map(|&u| sheet.iso_curve(UvDirection::U, u).unwrap())
        .collect();
    // A last-span knot on one member forces knot merging across the family.
    u_curves[2] = insert_knot(&u_curves[2], 0.95).unwrap();

    let result = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default()).unwrap();
    let diag = &result.diagnostics;
    assert_eq!(diag.u_curves_reversed + diag.v_curves_reversed, 0);
    for (got, want) in diag.u_placements.iter().zip(&u_levels) {
        assert!((got - want).abs() < 1e-9, "u placement {got} vs {want}");
    }
    for (got, want) in diag.v_placements.iter().zip(&v_levels) {
        assert!((got - want).abs() < 1e-9, "v placement {got} vs {want}");
    }

    for (curve, &v) in u_curves.iter().zip(&v_levels) {
        assert!(iso_deviation(&result.surface, UvDirection::V, v, curve, 80) < 1e-9);
    }
    for (curve, &u) in v_curves.iter().zip(&u_levels) {
        assert!(iso_deviation(&result.surface, UvDirection::U, u, curve, 80) < 1e-9);
    }
}

#[test]
fn uneven_cubic_network_interpolates_every_curve() {
    let u_levels = [0.0, 0.5, 1.0];
    let v_levels = [0.0, 0.3, 0.7, 1.0];
    let (u_curves, v_curves) = iso_network(3, cubic_sheet, &u_levels, &v_levels);
    let result = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default()).unwrap();
    let diag = &result.diagnostics;

    assert_eq!(diag.v_placements.len(), 4);
    for (got, want) in diag.v_placements.iter().zip(&v_levels) {
        assert!((got - want).abs() < 1e-10);
    }
    for (curve, &v) in result.u_curves.iter().zip(&diag.v_placements) {
        assert!(iso_deviation(&result.surface, UvDirection::V, v, curve, 60) < 1e-9);
    }
    for (curve, &u) in result.v_curves.iter().zip(&diag.u_placements) {
        assert!(iso_deviation(&result.surface, UvDirection::U, u, curve, 60) < 1e-9);
    }
}

#[test]
fn input_order_and_orientation_do_not_matter() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, v_curves) = iso_network(2, paraboloid, &levels, &levels);
    let reference = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default()).unwrap();

    let scrambled_u = vec![u_curves[0].clone(), u_curves[2].reversed(), u_curves[1].clone()];
    let scrambled_v = vec![v_curves[2].clone(), v_curves[0].clone(), v_curves[1].clone()];
    let result = build_gordon_surface(&scrambled_u, &scrambled_v, &GordonOptions::default()).unwrap();

    let diag = &result.diagnostics;
    assert_eq!(diag.u_curves_reversed, 1);
    assert_eq!(diag.v_curves_reversed, 0);
    assert_eq!(diag.u_curves_reordered, 2);
    assert_eq!(diag.v_curves_reordered, 3);
    assert!(!diag.is_clean());

    let eval = DeBoorEvaluator::new();
    for &(u, v) in &[(0.0, 0.0), (0.2, 0.7), (0.5, 0.5), (0.9, 0.1), (1.0, 1.0)] {
        let a = eval.surface_point(&reference.surface, u, v).unwrap();
        let b = eval.surface_point(&result.surface, u, v).unwrap();
        assert!(a.distance_to(b) < 1e-10);
    }
}

#[test]
fn curve_domains_are_normalized() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, v_curves) = iso_network(2, paraboloid, &levels, &levels);
    let shifted: Vec<_> = u_curves
        .iter()
        .map(|c| c.reparameterized(2.0, 5.0).unwrap())
        .collect();
    let result = build_gordon_surface(&shifted, &v_curves, &GordonOptions::default()).unwrap();
    assert_eq!(result.surface.domain_u(), (0.0, 1.0));
    let p = DeBoorEvaluator::new()
        .surface_point(&result.surface, 0.25, 0.75)
        .unwrap();
    assert!(p.distance_to(paraboloid(0.25, 0.75)) < 1e-10);
}

#[test]
fn custom_evaluator_is_used() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, v_curves) = iso_network(2, paraboloid, &levels, &levels);
    let eval: &dyn GeometryEvaluator = &DeBoorEvaluator::new().with_domain_slack(1e-8);
    let result = build_gordon_surface_with(eval, &u_curves, &v_curves, &GordonOptions::default()).unwrap();
    assert_eq!(result.surface.u_count, 3);
}

#[test]
fn malformed_networks_abort() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, v_curves) = iso_network(2, paraboloid, &levels, &levels);
    let options = GordonOptions::default();

    assert!(matches!(
        build_gordon_surface(&u_curves[..1], &v_curves, &options),
        Err(GeomError::Construction(ConstructionError::TooFewCurves {
            context: "u-curve family",
            provided: 1,
            ..
        }))
    ));
    assert_eq!(
        build_gordon_surface(&u_curves, &v_curves, &options.with_degrees(0, 3)).unwrap_err(),
        GeomError::Validation(ValidationError::ZeroDegree)
    );
    assert!(matches!(
        build_gordon_surface(
            &u_curves,
            &v_curves,
            &options.with_intersection_tolerance(Quantity::scalar(1e-4))
        ),
        Err(GeomError::Validation(ValidationError::Quantity(_)))
    ));
    assert_eq!(
        build_gordon_surface(
            &u_curves,
            &v_curves,
            &options.with_intersection_tolerance(Quantity::length(-1.0))
        )
        .unwrap_err(),
        GeomError::Validation(ValidationError::NonPositive("intersection tolerance"))
    );
}

#[test]
fn lifted_curve_does_not_intersect() {
    let levels = [0.0, 0.5, 1.0];
    let (u_curves, mut v_curves) = iso_network(2, paraboloid, &levels, &levels);
    v_curves[1] = super::polynomial_curve(2, |v| {
        let p = paraboloid(0.5, v);
        crate::geom::Point3::new(p.x, p.y, p.z + 0.01)
    });
    let err = build_gordon_surface(&u_curves, &v_curves, &GordonOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        GeomError::Construction(ConstructionError::CurvesDoNotIntersect { v_curve: 1, .. })
    ));

    // A looser tolerance accepts the gap and records it.
    let options = GordonOptions::default().with_intersection_tolerance(Quantity::length(0.02));
    let result = build_gordon_surface(&u_curves, &v_curves, &options).unwrap();
    let gap = result.diagnostics.max_intersection_gap;
    assert!(gap > 1e-3 && gap < 0.01, "gap {gap}");
}
