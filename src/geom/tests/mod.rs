mod test_compat;

use crate::geom::{DeBoorEvaluator, GeometryEvaluator, NurbsCurve3, NurbsSurface, Point3};

/// Largest distance between two curves sampled at `samples` parameters over
/// the domain of `a`.
pub(super) fn curve_deviation(a: &NurbsCurve3, b: &NurbsCurve3, samples: usize) -> f64 {
    let eval = DeBoorEvaluator::new();
    let (start, end) = a.domain();
    (0..=samples)
        .map(|i| {
            let t = start + (end - start) * i as f64 / samples as f64;
            let pa = eval.curve_point(a, t).unwrap();
            let pb = eval.curve_point(b, t).unwrap();
            pa.distance_to(pb)
        })
        .fold(0.0, f64::max)
}

pub(super) fn surface_deviation(a: &NurbsSurface, b: &NurbsSurface, samples: usize) -> f64 {
    let eval = DeBoorEvaluator::new();
    let (u0, u1) = a.domain_u();
    let (v0, v1) = a.domain_v();
    let mut worst = 0.0_f64;
    for i in 0..=samples {
        for j in 0..=samples {
            let u = u0 + (u1 - u0) * i as f64 / samples as f64;
            let v = v0 + (v1 - v0) * j as f64 / samples as f64;
            let pa = eval.surface_point(a, u, v).unwrap();
            let pb = eval.surface_point(b, u, v).unwrap();
            worst = worst.max(pa.distance_to(pb));
        }
    }
    worst
}

/// Cubic with one interior knot at 0.4.
pub(super) fn sample_cubic() -> NurbsCurve3 {
    NurbsCurve3::new(
        3,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.5),
            Point3::new(2.5, 2.0, -0.5),
            Point3::new(3.5, 0.5, 1.0),
            Point3::new(5.0, 1.0, 0.0),
        ],
        vec![0.0, 0.0, 0.0, 0.0, 0.4, 1.0, 1.0, 1.0, 1.0],
        None,
    )
    .unwrap()
}

/// Rational quadratic quarter circle of radius 1 in the xy plane.
pub(super) fn quarter_circle() -> NurbsCurve3 {
    NurbsCurve3::new(
        2,
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        Some(vec![1.0, std::f64::consts::FRAC_1_SQRT_2, 1.0]),
    )
    .unwrap()
}
