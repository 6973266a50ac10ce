//! Point/derivative evaluation and point fitting.
//!
//! The B-spline algebra and the Gordon pipeline only see the
//! [`GeometryEvaluator`] trait. [`DeBoorEvaluator`] is the bundled
//! implementation built on the classic basis-function algorithms.

use super::core::{HPoint4, Point3, Tolerance, Vec3};
use super::curve::NurbsCurve3;
use super::elevation::binomial;
use super::error::{ConstructionError, GeomError, ValidationError};
use super::knots::{approximation_knot_vector, averaging_knot_vector, find_span};
use super::surface::NurbsSurface;

/// Weight given to interpolate-indices in least-squares fits.
const PINNED_WEIGHT: f64 = 1e6;

/// Narrow evaluation contract consumed by the construction algorithms.
///
/// Implementations are shared across worker threads when the `parallel`
/// feature is on, hence the `Sync` bound.
pub trait GeometryEvaluator: Sync {
    /// `C^(k)(u)` for `k = 0..=order`. Entry 0 is the position.
    fn curve_derivatives(&self, curve: &NurbsCurve3, u: f64, order: usize) -> Result<Vec<Vec3>, ValidationError>;

    /// `S^(k,l)(u, v)` for `k + l <= order`, indexed `[k][l]`.
    fn surface_derivatives(
        &self,
        surface: &NurbsSurface,
        u: f64,
        v: f64,
        order: usize,
    ) -> Result<Vec<Vec<Vec3>>, ValidationError>;

    /// Fit a curve through `points` at `params`.
    ///
    /// `tolerance == 0` requests exact interpolation. Otherwise the fit only
    /// has to stay within `tolerance` of every point, and the points named in
    /// `interpolate_indices` are held as closely as the fit allows.
    fn approximate(
        &self,
        points: &[Point3],
        params: &[f64],
        degree: usize,
        tolerance: f64,
        interpolate_indices: &[usize],
    ) -> Result<NurbsCurve3, GeomError>;

    fn curve_point(&self, curve: &NurbsCurve3, u: f64) -> Result<Point3, ValidationError> {
        let ders = self.curve_derivatives(curve, u, 0)?;
        Ok(ders[0].to_point3())
    }

    fn surface_point(&self, surface: &NurbsSurface, u: f64, v: f64) -> Result<Point3, ValidationError> {
        let ders = self.surface_derivatives(surface, u, v, 0)?;
        Ok(ders[0][0].to_point3())
    }

    /// Positions at many parameters.
    fn curve_points(&self, curve: &NurbsCurve3, params: &[f64]) -> Result<Vec<Point3>, ValidationError> {
        params.iter().map(|&u| self.curve_point(curve, u)).collect()
    }
}

/// Basis-function evaluator for clamped and unclamped records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeBoorEvaluator {
    /// Parameters this far outside the domain are clamped instead of rejected.
    pub domain_slack: f64,
}

impl Default for DeBoorEvaluator {
    fn default() -> Self {
        Self {
            domain_slack: Tolerance::DEFAULT.eps,
        }
    }
}

impl DeBoorEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_domain_slack(mut self, slack: f64) -> Self {
        self.domain_slack = slack.abs();
        self
    }

    fn clamp_param(&self, value: f64, start: f64, end: f64) -> Result<f64, ValidationError> {
        if !value.is_finite() || value < start - self.domain_slack || value > end + self.domain_slack {
            return Err(ValidationError::ParameterOutOfDomain { value, start, end });
        }
        Ok(value.clamp(start, end))
    }

    /// Exact interpolation with an averaging knot vector.
    pub fn interpolate(&self, points: &[Point3], params: &[f64], degree: usize) -> Result<NurbsCurve3, GeomError> {
        validate_fit_input(points, params, degree)?;
        let knots = averaging_knot_vector(params, degree);
        let n = points.len();
        let matrix: Vec<Vec<f64>> = params
            .iter()
            .map(|&t| basis_row(n, degree, t, &knots))
            .collect();
        let control_points = solve_points(&matrix, points)?;
        Ok(NurbsCurve3::new(degree, control_points, knots, None)?)
    }

    fn least_squares(
        &self,
        points: &[Point3],
        params: &[f64],
        degree: usize,
        control_count: usize,
        interpolate_indices: &[usize],
    ) -> Result<NurbsCurve3, GeomError> {
        let m = points.len() - 1;
        let h = control_count - 1;
        let knots = approximation_knot_vector(params, degree, control_count);
        let (q0, qm) = (points[0], points[m]);

        let rows: Vec<Vec<f64>> = params
            .iter()
            .map(|&t| basis_row(control_count, degree, t, &knots))
            .collect();

        let mut control_points = vec![Point3::ORIGIN; control_count];
        control_points[0] = q0;
        control_points[h] = qm;

        let unknowns = control_count.saturating_sub(2);
        if unknowns > 0 {
            let mut normal = vec![vec![0.0; unknowns]; unknowns];
            let mut rhs = vec![Vec3::ZERO; unknowns];
            for k in 1..m {
                let weight = if interpolate_indices.contains(&k) {
                    PINNED_WEIGHT
                } else {
                    1.0
                };
                let row = &rows[k];
                let residual = points[k].to_vec3() - q0.to_vec3() * row[0] - qm.to_vec3() * row[h];
                for a in 1..h {
                    if row[a] == 0.0 {
                        continue;
                    }
                    rhs[a - 1] = rhs[a - 1] + residual * (weight * row[a]);
                    for b in 1..h {
                        normal[a - 1][b - 1] += weight * row[a] * row[b];
                    }
                }
            }
            let rhs_points: Vec<Point3> = rhs.into_iter().map(Vec3::to_point3).collect();
            let solved = solve_points(&normal, &rhs_points)?;
            control_points[1..h].copy_from_slice(&solved);
        }

        Ok(NurbsCurve3::new(degree, control_points, knots, None)?)
    }

    fn max_deviation(&self, curve: &NurbsCurve3, points: &[Point3], params: &[f64]) -> Result<f64, ValidationError> {
        let mut worst = 0.0_f64;
        for (point, &t) in points.iter().zip(params) {
            worst = worst.max(self.curve_point(curve, t)?.distance_to(*point));
        }
        Ok(worst)
    }
}

impl GeometryEvaluator for DeBoorEvaluator {
    fn curve_derivatives(&self, curve: &NurbsCurve3, u: f64, order: usize) -> Result<Vec<Vec3>, ValidationError> {
        let (start, end) = curve.domain();
        let u = self.clamp_param(u, start, end)?;
        let p = curve.degree;
        let n = curve.control_point_count() - 1;
        let span = find_span(n, p, u, &curve.knots);
        let nders = basis_function_derivatives(span, u, p, order.min(p), &curve.knots);
        let pw = curve.homogeneous_points();

        let mut aders = vec![HPoint4::new(0.0, 0.0, 0.0, 0.0); order + 1];
        for (k, row) in nders.iter().enumerate() {
            aders[k] = row
                .iter()
                .enumerate()
                .fold(HPoint4::new(0.0, 0.0, 0.0, 0.0), |acc, (j, &b)| acc + pw[span - p + j] * b);
        }
        rational_curve_derivatives(&aders)
    }

    fn surface_derivatives(
        &self,
        surface: &NurbsSurface,
        u: f64,
        v: f64,
        order: usize,
    ) -> Result<Vec<Vec<Vec3>>, ValidationError> {
        let (u0, u1) = surface.domain_u();
        let (v0, v1) = surface.domain_v();
        let u = self.clamp_param(u, u0, u1)?;
        let v = self.clamp_param(v, v0, v1)?;
        let (p, q) = (surface.degree_u, surface.degree_v);

        let uspan = find_span(surface.u_count - 1, p, u, &surface.knots_u);
        let vspan = find_span(surface.v_count - 1, q, v, &surface.knots_v);
        let du = order.min(p);
        let dv = order.min(q);
        let nu = basis_function_derivatives(uspan, u, p, du, &surface.knots_u);
        let nv = basis_function_derivatives(vspan, v, q, dv, &surface.knots_v);

        let zero = HPoint4::new(0.0, 0.0, 0.0, 0.0);
        let mut aders = vec![vec![zero; order + 1]; order + 1];
        for k in 0..=du {
            let mut temp = vec![zero; q + 1];
            for (s, slot) in temp.iter_mut().enumerate() {
                for r in 0..=p {
                    *slot = *slot + surface.control_hpoint(uspan - p + r, vspan - q + s) * nu[k][r];
                }
            }
            for l in 0..=dv.min(order - k) {
                aders[k][l] = temp
                    .iter()
                    .enumerate()
                    .fold(zero, |acc, (s, hp)| acc + *hp * nv[l][s]);
            }
        }
        rational_surface_derivatives(&aders, order)
    }

    fn approximate(
        &self,
        points: &[Point3],
        params: &[f64],
        degree: usize,
        tolerance: f64,
        interpolate_indices: &[usize],
    ) -> Result<NurbsCurve3, GeomError> {
        validate_fit_input(points, params, degree)?;
        if tolerance <= 0.0 || points.len() == degree + 1 {
            return self.interpolate(points, params, degree);
        }

        let count = points.len();
        for control_count in degree + 1..count {
            match self.least_squares(points, params, degree, control_count, interpolate_indices) {
                Ok(curve) => {
                    let deviation = self.max_deviation(&curve, points, params)?;
                    log::trace!("least squares with {control_count} control points: deviation {deviation:.3e}");
                    if deviation <= tolerance {
                        return Ok(curve);
                    }
                }
                Err(GeomError::Construction(ConstructionError::SingularSystem(reason))) => {
                    log::debug!("least squares with {control_count} control points is singular: {reason}");
                }
                Err(other) => return Err(other),
            }
        }

        let curve = self.interpolate(points, params, degree)?;
        let deviation = self.max_deviation(&curve, points, params)?;
        if deviation > tolerance {
            return Err(ConstructionError::ApproximationFailed { tolerance, deviation }.into());
        }
        Ok(curve)
    }
}

fn validate_fit_input(points: &[Point3], params: &[f64], degree: usize) -> Result<(), ValidationError> {
    if degree == 0 {
        return Err(ValidationError::ZeroDegree);
    }
    if points.len() != params.len() {
        return Err(ValidationError::LengthMismatch {
            what: "fit parameters",
            expected: points.len(),
            provided: params.len(),
        });
    }
    if points.len() < degree + 1 {
        return Err(ValidationError::TooFewControlPoints {
            context: "curve fit",
            required: degree + 1,
            provided: points.len(),
        });
    }
    if points.iter().any(|p| !p.is_finite()) || params.iter().any(|t| !t.is_finite()) {
        return Err(ValidationError::NonFinite("fit input"));
    }
    if params.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ValidationError::NotIncreasing("fit parameters"));
    }
    Ok(())
}

/// Row of the collocation matrix: `N_{j,p}(t)` for `j = 0..count`.
fn basis_row(count: usize, degree: usize, t: f64, knots: &[f64]) -> Vec<f64> {
    let span = find_span(count - 1, degree, t, knots);
    let values = basis_functions(span, t, degree, knots);
    let mut row = vec![0.0; count];
    row[span - degree..=span].copy_from_slice(&values);
    row
}

/// Non-vanishing basis functions `N_{span-p..=span, p}(u)` (P&T A2.2).
#[must_use]
pub fn basis_functions(span: usize, u: f64, p: usize, knots: &[f64]) -> Vec<f64> {
    let mut n = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    n[0] = 1.0;
    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { n[r] / denom };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Basis functions and their derivatives up to `order` (P&T A2.3), indexed
/// `[k][j]`.
#[must_use]
pub fn basis_function_derivatives(span: usize, u: f64, p: usize, order: usize, knots: &[f64]) -> Vec<Vec<f64>> {
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    ndu[0][0] = 1.0;
    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = if ndu[j][r] == 0.0 { 0.0 } else { ndu[r][j - 1] / ndu[j][r] };
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; order + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let pi = p as isize;
    let mut a = vec![vec![0.0; p + 1]; 2];
    for r in 0..=pi {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0][0] = 1.0;
        for k in 1..=order as isize {
            let mut d = 0.0;
            let rk = r - k;
            let pk = pi - k;
            if r >= k {
                let denom = ndu[(pk + 1) as usize][rk as usize];
                a[s2][0] = if denom == 0.0 { 0.0 } else { a[s1][0] / denom };
                d = a[s2][0] * ndu[rk as usize][pk as usize];
            }
            let j1 = if rk >= -1 { 1 } else { -rk };
            let j2 = if r - 1 <= pk { k - 1 } else { pi - r };
            for j in j1..=j2 {
                let denom = ndu[(pk + 1) as usize][(rk + j) as usize];
                a[s2][j as usize] = if denom == 0.0 {
                    0.0
                } else {
                    (a[s1][j as usize] - a[s1][(j - 1) as usize]) / denom
                };
                d += a[s2][j as usize] * ndu[(rk + j) as usize][pk as usize];
            }
            if r <= pk {
                let denom = ndu[(pk + 1) as usize][r as usize];
                a[s2][k as usize] = if denom == 0.0 {
                    0.0
                } else {
                    -a[s1][(k - 1) as usize] / denom
                };
                d += a[s2][k as usize] * ndu[r as usize][pk as usize];
            }
            ders[k as usize][r as usize] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = p as f64;
    for (k, row) in ders.iter_mut().enumerate().skip(1) {
        for value in row.iter_mut() {
            *value *= factor;
        }
        factor *= (p as f64) - k as f64;
    }
    ders
}

/// Quotient rule for rational curves (P&T A4.2).
fn rational_curve_derivatives(aders: &[HPoint4]) -> Result<Vec<Vec3>, ValidationError> {
    let w0 = aders[0].w;
    if w0 == 0.0 || !w0.is_finite() {
        return Err(ValidationError::InvalidWeight);
    }
    let mut ck: Vec<Vec3> = Vec::with_capacity(aders.len());
    for k in 0..aders.len() {
        let mut v = aders[k].weighted_part().to_vec3();
        for i in 1..=k {
            v = v - ck[k - i] * (binomial(k, i) * aders[i].w);
        }
        ck.push(v / w0);
    }
    Ok(ck)
}

/// Quotient rule for rational surfaces (P&T A4.4).
fn rational_surface_derivatives(aders: &[Vec<HPoint4>], order: usize) -> Result<Vec<Vec<Vec3>>, ValidationError> {
    let w00 = aders[0][0].w;
    if w00 == 0.0 || !w00.is_finite() {
        return Err(ValidationError::InvalidWeight);
    }
    let mut skl = vec![vec![Vec3::ZERO; order + 1]; order + 1];
    for k in 0..=order {
        for l in 0..=order - k {
            let mut v = aders[k][l].weighted_part().to_vec3();
            for j in 1..=l {
                v = v - skl[k][l - j] * (binomial(l, j) * aders[0][j].w);
            }
            for i in 1..=k {
                v = v - skl[k - i][l] * (binomial(k, i) * aders[i][0].w);
                let mut v2 = Vec3::ZERO;
                for j in 1..=l {
                    v2 = v2 + skl[k - i][l - j] * (binomial(l, j) * aders[i][j].w);
                }
                v = v - v2 * binomial(k, i);
            }
            skl[k][l] = v / w00;
        }
    }
    Ok(skl)
}

/// In-place de Boor triangle on `p + 1` homogeneous points; the result lands
/// in `d[p]`.
pub(crate) fn de_boor_homogeneous(d: &mut [HPoint4], span: usize, p: usize, u: f64, knots: &[f64]) {
    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = span - p + j;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}

/// Solve `matrix * X = rhs` for three coordinate columns at once.
fn solve_points(matrix: &[Vec<f64>], rhs: &[Point3]) -> Result<Vec<Point3>, ConstructionError> {
    let xs: Vec<f64> = rhs.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = rhs.iter().map(|p| p.y).collect();
    let zs: Vec<f64> = rhs.iter().map(|p| p.z).collect();
    let x = solve_linear_system(matrix, &xs)?;
    let y = solve_linear_system(matrix, &ys)?;
    let z = solve_linear_system(matrix, &zs)?;
    Ok((0..rhs.len()).map(|i| Point3::new(x[i], y[i], z[i])).collect())
}

/// Gaussian elimination with partial pivoting.
pub(crate) fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>, ConstructionError> {
    let n = matrix.len();
    if n == 0 || rhs.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(ConstructionError::SingularSystem(format!(
            "invalid matrix dimensions ({n} rows, {} right-hand sides)",
            rhs.len()
        )));
    }

    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, &b)| {
            let mut r = row.clone();
            r.push(b);
            r
        })
        .collect();

    // Forward elimination with partial pivoting
    for k in 0..n {
        let mut max_row = k;
        let mut max_val = aug[k][k].abs();
        for (i, row) in aug.iter().enumerate().skip(k + 1) {
            if row[k].abs() > max_val {
                max_val = row[k].abs();
                max_row = i;
            }
        }
        if max_val < 1e-14 {
            return Err(ConstructionError::SingularSystem(format!("zero pivot in column {k}")));
        }
        if max_row != k {
            aug.swap(k, max_row);
        }

        let pivot = aug[k][k];
        for i in (k + 1)..n {
            let factor = aug[i][k] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in k..=n {
                aug[i][j] -= factor * aug[k][j];
            }
        }
    }

    // Back substitution
    let mut result = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * result[j];
        }
        result[i] = sum / aug[i][i];
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_functions_partition_unity() {
        let knots = [0.0, 0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0];
        for &u in &[0.0, 0.1, 0.3, 0.45, 0.99, 1.0] {
            let span = find_span(5, 3, u, &knots);
            let sum: f64 = basis_functions(span, u, 3, &knots).iter().sum();
            assert!((sum - 1.0).abs() < 1e-14, "u = {u}");
        }
    }

    #[test]
    fn basis_derivatives_sum_to_zero() {
        let knots = [0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        let span = find_span(3, 2, 0.25, &knots);
        let ders = basis_function_derivatives(span, 0.25, 2, 2, &knots);
        assert_eq!(ders.len(), 3);
        for row in &ders[1..] {
            assert!(row.iter().sum::<f64>().abs() < 1e-12);
        }
    }

    #[test]
    fn linear_system_solves_with_pivoting() {
        let matrix = vec![vec![0.0, 2.0], vec![1.0, 1.0]];
        let x = solve_linear_system(&matrix, &[4.0, 3.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-14);
        assert!((x[1] - 2.0).abs() < 1e-14);
    }

    #[test]
    fn singular_system_is_reported() {
        let matrix = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            solve_linear_system(&matrix, &[1.0, 2.0]),
            Err(ConstructionError::SingularSystem(_))
        ));
    }
}
