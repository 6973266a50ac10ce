//! Curve and surface compatibility unification.

use super::{curve_deviation, quarter_circle, sample_cubic, surface_deviation};
use crate::geom::{
    GeomError, NurbsCurve3, NurbsSurface, Point3, Tolerance, ValidationError, unify_curves,
    unify_surfaces,
};

fn cubic_two_knots() -> NurbsCurve3 {
    NurbsCurve3::new(
        3,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, -1.0, 0.5),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(4.0, 0.0, 1.0),
            Point3::new(5.0, 0.5, 0.0),
        ],
        vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0],
        None,
    )
    .unwrap()
}

fn quartic_one_knot() -> NurbsCurve3 {
    NurbsCurve3::new(
        4,
        vec![
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(1.0, 3.0, 1.0),
            Point3::new(2.0, 2.5, 0.0),
            Point3::new(3.0, 3.0, -1.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(5.0, 2.5, 0.5),
        ],
        vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0],
        None,
    )
    .unwrap()
}

#[test]
fn cubic_and_quartic_share_degree_and_knots() {
    let inputs = [cubic_two_knots(), quartic_one_knot()];
    let unified = unify_curves(&inputs, Tolerance::KNOT).unwrap();

    assert_eq!(unified.len(), 2);
    for curve in &unified {
        assert_eq!(curve.degree, 4);
        assert_eq!(
            curve.knots,
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 0.3, 0.3, 0.5, 0.6, 0.6, 1.0, 1.0, 1.0, 1.0, 1.0
            ]
        );
        assert_eq!(curve.control_point_count(), 10);
    }
    for (original, unified) in inputs.iter().zip(&unified) {
        assert!(curve_deviation(original, unified, 100) < 1e-10);
    }
}

#[test]
fn domains_are_mapped_onto_the_first_curve() {
    let shifted = sample_cubic().reparameterized(2.0, 5.0).unwrap();
    let unified = unify_curves(&[sample_cubic(), shifted], Tolerance::KNOT).unwrap();
    assert_eq!(unified[0].knots, unified[1].knots);
    assert_eq!(unified[1].domain(), (0.0, 1.0));
    assert!(curve_deviation(&unified[0], &unified[1], 50) < 1e-12);
}

#[test]
fn nearly_equal_knots_collapse_into_one_bucket() {
    let a = sample_cubic();
    let mut knots = a.knots.clone();
    knots[4] = 0.4 + 5e-11;
    let b = NurbsCurve3::new(3, a.control_points.clone(), knots, None).unwrap();

    let unified = unify_curves(&[a, b], Tolerance::KNOT).unwrap();
    assert_eq!(unified[0].knots, unified[1].knots);
    assert_eq!(unified[0].control_point_count(), 5);
}

#[test]
fn rational_and_polynomial_members_mix() {
    let line = NurbsCurve3::new(
        1,
        vec![Point3::new(1.0, 0.0, 1.0), Point3::new(0.0, 1.0, 1.0)],
        vec![0.0, 0.0, 1.0, 1.0],
        None,
    )
    .unwrap();
    let unified = unify_curves(&[quarter_circle(), line.clone()], Tolerance::KNOT).unwrap();
    assert_eq!(unified[1].degree, 2);
    assert_eq!(unified[0].knots, unified[1].knots);
    assert!(curve_deviation(&line, &unified[1], 20) < 1e-12);
}

#[test]
fn empty_family_is_rejected() {
    assert_eq!(
        unify_curves(&[], Tolerance::KNOT),
        Err(GeomError::Validation(ValidationError::EmptyFamily))
    );
}

#[test]
fn surfaces_become_grid_compatible() {
    let bilinear = NurbsSurface::from_grid(
        1,
        1,
        vec![
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)],
        ],
        vec![0.0, 0.0, 1.0, 1.0],
        vec![0.0, 0.0, 1.0, 1.0],
        None,
    )
    .unwrap();
    let bumpy = NurbsSurface::from_grid(
        2,
        1,
        vec![
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![Point3::new(0.4, 0.0, 1.0), Point3::new(0.4, 1.0, 1.0)],
            vec![Point3::new(0.7, 0.0, -1.0), Point3::new(0.7, 1.0, 0.0)],
            vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
        ],
        vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
        vec![0.0, 0.0, 1.0, 1.0],
        None,
    )
    .unwrap();

    let unified = unify_surfaces(&[bilinear.clone(), bumpy.clone()], Tolerance::KNOT).unwrap();
    let (a, b) = (&unified[0], &unified[1]);
    assert_eq!((a.degree_u, a.degree_v), (2, 1));
    assert_eq!((a.u_count, a.v_count), (b.u_count, b.v_count));
    assert_eq!(a.knots_u, b.knots_u);
    assert_eq!(a.knots_v, b.knots_v);
    assert_eq!(a.knots_u, vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
    assert!(surface_deviation(&bilinear, a, 10) < 1e-12);
    assert!(surface_deviation(&bumpy, b, 10) < 1e-12);
}
