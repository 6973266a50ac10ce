mod test_pipeline;

use crate::geom::{DeBoorEvaluator, GeometryEvaluator, NurbsCurve3, NurbsSurface, Point3, UvDirection};

/// Exact polynomial curve of `degree` through `f` on `[0, 1]`.
///
/// Interpolating `degree + 1` uniform samples reproduces any polynomial of
/// that degree, so the result is parameterized exactly like `f`.
pub(super) fn polynomial_curve(degree: usize, f: impl Fn(f64) -> Point3) -> NurbsCurve3 {
    let params: Vec<f64> = (0..=degree).map(|k| k as f64 / degree as f64).collect();
    let points: Vec<Point3> = params.iter().map(|&t| f(t)).collect();
    DeBoorEvaluator::new().interpolate(&points, &params, degree).unwrap()
}

/// `z = u^2 (1 - v) + v^2`: biquadratic, with quadratic iso-curves.
pub(super) fn paraboloid(u: f64, v: f64) -> Point3 {
    Point3::new(u, v, u * u * (1.0 - v) + v * v)
}

/// `z = u^3 v - 2 u v^2 + v^3 / 2`: cubic iso-curves in both directions.
pub(super) fn cubic_sheet(u: f64, v: f64) -> Point3 {
    Point3::new(u, v, u * u * u * v - 2.0 * u * v * v + 0.5 * v * v * v)
}

/// Iso-curves of `surface` at `v_levels` (u-curves) and `u_levels` (v-curves).
pub(super) fn iso_network(
    degree: usize,
    surface: fn(f64, f64) -> Point3,
    u_levels: &[f64],
    v_levels: &[f64],
) -> (Vec<NurbsCurve3>, Vec<NurbsCurve3>) {
    let u_curves = v_levels
        .iter()
        .map(|&v| polynomial_curve(degree, |u| surface(u, v)))
        .collect();
    let v_curves = u_levels
        .iter()
        .map(|&u| polynomial_curve(degree, |v| surface(u, v)))
        .collect();
    (u_curves, v_curves)
}

/// Largest distance between `curve` and the iso-curve of `surface` that
/// holds `direction` at `parameter`.
pub(super) fn iso_deviation(
    surface: &NurbsSurface,
    direction: UvDirection,
    parameter: f64,
    curve: &NurbsCurve3,
    samples: usize,
) -> f64 {
    let eval = DeBoorEvaluator::new();
    (0..=samples)
        .map(|k| {
            let t = k as f64 / samples as f64;
            let on_surface = match direction {
                UvDirection::U => eval.surface_point(surface, parameter, t).unwrap(),
                UvDirection::V => eval.surface_point(surface, t, parameter).unwrap(),
            };
            on_surface.distance_to(eval.curve_point(curve, t).unwrap())
        })
        .fold(0.0, f64::max)
}
